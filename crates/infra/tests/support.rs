use std::sync::Arc;
use std::time::Duration;

use partspro_common::testing::TempDatabase;
use partspro_infra::database::DbManager;

/// Migrated SQLite database that lives as long as the value.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp: TempDatabase,
}

impl TestDatabase {
    pub fn new() -> Self {
        let temp = TempDatabase::new("sync.db").expect("temp database path");
        let manager = DbManager::new(temp.path(), 4).expect("db manager should be created");
        manager.run_migrations().expect("schema should apply");
        Self { manager: Arc::new(manager), _temp: temp }
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// Poll `condition` every 10ms for up to two seconds.
pub async fn wait_for<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
