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

use std::collections::HashSet;
use std::sync::Arc;

use ferry_relayer_types::RedemptionKey;
use parking_lot::Mutex;

/// The redemption keys a writer is currently working on.
#[derive(Debug, Default)]
pub struct ActiveRedemptions {
    keys: Mutex<HashSet<RedemptionKey>>,
}

impl ActiveRedemptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` active. Returns `false` if it already was.
    pub fn try_begin(&self, key: RedemptionKey) -> bool {
        self.keys.lock().insert(key)
    }

    /// Releases `key`. Returns `false` if it was not active.
    pub fn finish(&self, key: &RedemptionKey) -> bool {
        self.keys.lock().remove(key)
    }

    pub fn contains(&self, key: &RedemptionKey) -> bool {
        self.keys.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.lock().is_empty()
    }

    /// Like [`Self::try_begin`], but the key is released when the returned
    /// guard is dropped.
    pub fn begin(self: &Arc<Self>, key: RedemptionKey) -> Option<RedemptionGuard> {
        self.try_begin(key.clone()).then(|| RedemptionGuard {
            set: Arc::clone(self),
            key,
        })
    }
}

/// Releases its redemption key on drop.
#[derive(Debug)]
pub struct RedemptionGuard {
    set: Arc<ActiveRedemptions>,
    key: RedemptionKey,
}

impl RedemptionGuard {
    pub fn key(&self) -> &RedemptionKey {
        &self.key
    }
}

impl Drop for RedemptionGuard {
    fn drop(&mut self) {
        self.set.finish(&self.key);
    }
}
