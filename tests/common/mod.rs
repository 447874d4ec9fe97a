pub mod fixtures;
pub mod mock_remote;
