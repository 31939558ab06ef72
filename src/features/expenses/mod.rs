/// 経費機能モジュール
///
/// 課金エンジンが生成する台帳エントリ（経費レコード）を扱います。
/// 課金由来の経費は作成後にエンジンが変更することはありません。
pub mod models;
pub mod repository;

pub use models::{Expense, NewExpense};
