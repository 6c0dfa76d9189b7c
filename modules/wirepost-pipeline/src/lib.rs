pub mod cluster;
pub mod compose;
pub mod feeds;
pub mod images;
pub mod ledger;
pub mod merge;
pub mod prompts;
pub mod publish;
pub mod run;
pub mod select;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
