use std::borrow::Cow;

use libmdbx::{
    Cursor, Database, DatabaseOptions, Mode, NoWriteMap, PageSize, ReadWriteOptions, SyncMode,
    TableFlags, WriteFlags, RO,
};

use super::{Engine, PointLookup, ScanStats};
use crate::batch::Pair;
use crate::config::{EngineConfig, PutMode};
use crate::{Error, Result};

pub struct MdbxEngine {
    db: Database<NoWriteMap>,
    config: EngineConfig,
}

impl MdbxEngine {
    fn options(config: &EngineConfig) -> DatabaseOptions {
        let sync_mode = if config.durable {
            SyncMode::Durable
        } else {
            SyncMode::SafeNoSync
        };
        DatabaseOptions {
            max_tables: Some(config.max_dbs as u64),
            max_readers: Some(config.max_readers as u64),
            rp_augment_limit: Some(config.rp_augment_limit),
            page_size: Some(PageSize::Set(config.page_size)),
            no_rdahead: config.no_readahead,
            mode: Mode::ReadWrite(ReadWriteOptions {
                sync_mode,
                max_size: Some(config.map_size as isize),
                growth_step: Some(config.growth_step as isize),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

impl Engine for MdbxEngine {
    fn open(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.data_dir).map_err(|e| Error::io(&config.data_dir, e))?;

        let db = Database::open_with_options(&config.data_dir, Self::options(config))?;

        let flags = if config.dup_sort {
            TableFlags::DUP_SORT
        } else {
            TableFlags::empty()
        };
        let txn = db.begin_rw_txn()?;
        txn.create_table(Some(config.table()), flags)?;
        txn.commit()?;

        Ok(Self {
            db,
            config: config.clone(),
        })
    }

    fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn insert_batch(&self, pairs: &[Pair], mode: PutMode) -> Result<()> {
        let flags = match mode {
            PutMode::Upsert => WriteFlags::UPSERT,
            // Equal keys fail a plain APPEND, so duplicates only append their values.
            PutMode::Append if self.config.dup_sort => WriteFlags::APPEND_DUP,
            PutMode::Append => WriteFlags::APPEND,
        };

        let txn = self.db.begin_rw_txn()?;
        {
            let table = txn.open_table(Some(self.config.table()))?;
            let mut cursor = txn.cursor(&table)?;
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
        let txn = self.db.begin_ro_txn()?;
        let table = txn.open_table(Some(self.config.table()))?;
        let mut lookup = MdbxLookup {
            cursor: txn.cursor(&table)?,
            dup_sort: self.config.dup_sort,
        };
        f(&mut lookup)
    }

    fn scan(&self) -> Result<ScanStats> {
        let txn = self.db.begin_ro_txn()?;
        let table = txn.open_table(Some(self.config.table()))?;
        let mut cursor = txn.cursor(&table)?;
        let dup_sort = self.config.dup_sort;

        let mut stats = ScanStats::default();
        let mut entry = cursor.first::<Cow<'_, [u8]>, Cow<'_, [u8]>>()?;
        while let Some((key, value)) = entry {
            let key_len = key.len();
            stats.first_value(key_len, value.len());
            if dup_sort {
                while let Some(((), value)) = cursor.next_dup::<(), Cow<'_, [u8]>>()? {
                    stats.dup_value(key_len, value.len());
                }
                entry = cursor.next_nodup()?;
            } else {
                entry = cursor.next()?;
            }
        }
        Ok(stats)
    }
}

struct MdbxLookup<'txn> {
    cursor: Cursor<'txn, RO>,
    dup_sort: bool,
}

impl PointLookup for MdbxLookup<'_> {
    fn set(&mut self, key: &[u8]) -> Result<bool> {
        Ok(self.cursor.set::<()>(key)?.is_some())
    }

    fn get_both_range(&mut self, key: &[u8], value: &[u8]) -> Result<bool> {
        if !self.dup_sort {
            let stored = self.cursor.set::<Cow<'_, [u8]>>(key)?;
            return Ok(stored.is_some_and(|stored| stored.as_ref() >= value));
        }
        Ok(self.cursor.get_both_range::<()>(key, value)?.is_some())
    }
}
