use lmdb::{
    Cursor, Database, DatabaseFlags, Environment, EnvironmentFlags, RoCursor, Transaction,
    WriteFlags,
};
use lmdb_sys::{MDB_FIRST, MDB_GET_BOTH_RANGE, MDB_NEXT, MDB_NEXT_DUP, MDB_NEXT_NODUP, MDB_SET};

use super::{Engine, PointLookup, ScanStats};
use crate::batch::Pair;
use crate::config::{EngineConfig, PutMode};
use crate::{Error, Result};

pub struct LmdbEngine {
    db: Database,
    env: Environment,
    config: EngineConfig,
}

/// Maps `NotFound` to `None`, keeping every other error.
fn found<T>(result: lmdb::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(lmdb::Error::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl Engine for LmdbEngine {
    fn open(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.data_dir).map_err(|e| Error::io(&config.data_dir, e))?;

        let mut flags = EnvironmentFlags::empty();
        if config.no_readahead {
            flags |= EnvironmentFlags::NO_READAHEAD;
        }
        if !config.durable {
            flags |= EnvironmentFlags::NO_SYNC;
        }
        let env = Environment::new()
            .set_flags(flags)
            .set_max_dbs(config.max_dbs)
            .set_max_readers(config.max_readers)
            .set_map_size(config.map_size)
            .open_with_permissions(&config.data_dir, 0o644)?;

        let db_flags = if config.dup_sort {
            DatabaseFlags::DUP_SORT
        } else {
            DatabaseFlags::empty()
        };
        let db = env.create_db(Some(config.table()), db_flags)?;

        Ok(Self {
            db,
            env,
            config: config.clone(),
        })
    }

    fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn insert_batch(&self, pairs: &[Pair], mode: PutMode) -> Result<()> {
        let flags = match mode {
            PutMode::Upsert => WriteFlags::empty(),
            // Equal keys fail a plain APPEND, so duplicates only append their values.
            PutMode::Append if self.config.dup_sort => WriteFlags::APPEND_DUP,
            PutMode::Append => WriteFlags::APPEND,
        };

        let mut txn = self.env.begin_rw_txn()?;
        {
            let mut cursor = txn.open_rw_cursor(self.db)?;
            for pair in pairs {
                cursor.put(&pair.key, &pair.value, flags)?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    fn with_read_cursor<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn PointLookup) -> Result<T>,
    {
        let txn = self.env.begin_ro_txn()?;
        let out = {
            let mut lookup = LmdbLookup {
                cursor: txn.open_ro_cursor(self.db)?,
                dup_sort: self.config.dup_sort,
            };
            f(&mut lookup)?
        };
        txn.abort();
        Ok(out)
    }

    fn scan(&self) -> Result<ScanStats> {
        let txn = self.env.begin_ro_txn()?;
        let cursor = txn.open_ro_cursor(self.db)?;
        let dup_sort = self.config.dup_sort;
        let step = if dup_sort { MDB_NEXT_NODUP } else { MDB_NEXT };

        let mut stats = ScanStats::default();
        let mut entry = found(cursor.get(None, None, MDB_FIRST))?;
        while let Some((key, value)) = entry {
            let key_len = key.map_or(0, <[u8]>::len);
            stats.first_value(key_len, value.len());
            if dup_sort {
                while let Some((_, value)) = found(cursor.get(None, None, MDB_NEXT_DUP))? {
                    stats.dup_value(key_len, value.len());
                }
            }
            entry = found(cursor.get(None, None, step))?;
        }
        Ok(stats)
    }
}

struct LmdbLookup<'txn> {
    cursor: RoCursor<'txn>,
    dup_sort: bool,
}

impl PointLookup for LmdbLookup<'_> {
    fn set(&mut self, key: &[u8]) -> Result<bool> {
        Ok(found(self.cursor.get(Some(key), None, MDB_SET))?.is_some())
    }

    fn get_both_range(&mut self, key: &[u8], value: &[u8]) -> Result<bool> {
        if !self.dup_sort {
            // LMDB answers MDB_INCOMPATIBLE here, a single value is the only "range".
            let stored = found(self.cursor.get(Some(key), None, MDB_SET))?;
            return Ok(stored.is_some_and(|(_, stored)| stored >= value));
        }
        Ok(found(self.cursor.get(Some(key), Some(value), MDB_GET_BOTH_RANGE))?.is_some())
    }
}
