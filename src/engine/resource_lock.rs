// ==========================================
// 机位维护排程系统 - 资源级互斥
// ==========================================
// 职责: 同一资源上的「读-决策-写」序列串行执行
// 说明: 不同资源互不阻塞；锁中毒时直接恢复（守护数据为空元组）
// 回收: 释放时若无其他持有者/等待者，则从登记表移除
// ==========================================

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Default)]
pub struct ResourceLockRegistry {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ResourceLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取资源对应的互斥锁（不存在则创建）
    pub fn lock_for(&self, resource_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(resource_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// 持有资源锁执行闭包
    pub fn with_lock<T>(&self, resource_id: &str, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(resource_id);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            tracing::trace!(resource_id, "已获取资源锁");
            f()
        };
        self.release(resource_id, lock);
        result
    }

    fn release(&self, resource_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = locks
            .get(resource_id)
            .map(|registered| Arc::ptr_eq(registered, &lock) && Arc::strong_count(&lock) == 2)
            .unwrap_or(false);
        // 登记表 + 当前调用方各持一份
        if idle {
            locks.remove(resource_id);
        }
    }

    /// 已登记的资源数
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .map(|locks| locks.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
