pub mod firestore;
pub mod leetcode;

pub use firestore::FirestoreAdapter;
pub use leetcode::LeetCodeAdapter;
