// Copyright 2022 Webb Technologies Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use super::{HistoryStore, HistoryStoreKey};

const LAST_BLOCK_NUMBERS: &str = "last_block_numbers";

/// SledStore is a store that keeps the block cursors in a [Sled](https://sled.rs)-based database.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
    // keeps the directory of a temporary store alive.
    _dir: Option<Arc<tempfile::TempDir>>,
}

impl std::fmt::Debug for SledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore").finish()
    }
}

impl SledStore {
    /// Create a new SledStore.
    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let db = sled::Config::new()
            .path(path)
            .mode(sled::Mode::HighThroughput)
            .open()?;
        Ok(Self { db, _dir: None })
    }

    /// Creates a temporary SledStore, removed once the last clone is dropped.
    pub fn temporary() -> crate::Result<Self> {
        let dir = tempfile::tempdir()?;
        let db = sled::Config::new()
            .path(dir.path())
            .temporary(true)
            .open()?;
        Ok(Self {
            db,
            _dir: Some(Arc::new(dir)),
        })
    }

    /// Gets the total amount of data stored on disk
    pub fn get_data_stored_size(&self) -> u64 {
        self.db.size_on_disk().unwrap_or_default()
    }

    fn decode(bytes: &[u8]) -> crate::Result<u64> {
        let output: [u8; 8] = bytes.try_into().map_err(|_| {
            ferry_relayer_utils::Error::Generic("corrupted block number")
        })?;
        Ok(u64::from_le_bytes(output))
    }
}

impl HistoryStore for SledStore {
    #[tracing::instrument(skip(self))]
    fn set_last_block_number<K: Into<HistoryStoreKey> + Debug>(
        &self,
        key: K,
        block_number: u64,
    ) -> crate::Result<u64> {
        let tree = self.db.open_tree(LAST_BLOCK_NUMBERS)?;
        let bytes = block_number.to_le_bytes();
        let key: HistoryStoreKey = key.into();
        let old = tree.insert(key.to_bytes(), &bytes)?;
        tree.flush()?;
        match old {
            Some(v) => Self::decode(&v),
            None => Ok(block_number),
        }
    }

    #[tracing::instrument(skip(self))]
    fn last_block_number<K: Into<HistoryStoreKey> + Debug>(
        &self,
        key: K,
    ) -> crate::Result<Option<u64>> {
        let tree = self.db.open_tree(LAST_BLOCK_NUMBERS)?;
        let key: HistoryStoreKey = key.into();
        tree.get(key.to_bytes())?
            .map(|v| Self::decode(&v))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_relayer_types::ChainId;

    #[test]
    fn get_last_block_number_should_work() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SledStore::open(tmp.path()).unwrap();
        let key = ChainId(6);
        assert_eq!(store.last_block_number(key).unwrap(), None);
        assert_eq!(store.get_last_block_number(key, 1).unwrap(), 1);
        store.set_last_block_number(key, 20).unwrap();
        assert_eq!(store.set_last_block_number(key, 21).unwrap(), 20);
        assert_eq!(store.get_last_block_number(key, 1).unwrap(), 21);
    }

    #[test]
    fn cursor_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let store = SledStore::open(tmp.path()).unwrap();
            store.set_last_block_number(ChainId(11), 4242).unwrap();
        }
        let store = SledStore::open(tmp.path()).unwrap();
        assert_eq!(store.last_block_number(ChainId(11)).unwrap(), Some(4242));
    }

    #[test]
    fn temporary_store_works() {
        let store = SledStore::temporary().unwrap();
        store.set_last_block_number(ChainId(1), 7).unwrap();
        let clone = store.clone();
        drop(store);
        assert_eq!(clone.last_block_number(ChainId(1)).unwrap(), Some(7));
    }
}
