//! 单例初始化的等待关系
//!
//! 记录每个正在初始化的单例槽位由哪个线程负责，以及每个线程正在等待哪个槽位。
//! 阻塞在槽位上之前沿 "槽位 -> 负责线程 -> 该线程等待的槽位" 链检查，
//! 链回到当前线程就说明等待会形成跨线程的循环依赖。

use parking_lot::Mutex;
use std::any::TypeId;
use std::collections::HashMap;
use std::thread::{self, ThreadId};

/// 槽位标识：(主类型, 所属作用域 id)
pub type SlotId = (TypeId, uuid::Uuid);

#[derive(Debug, Default)]
struct WaitGraph {
    owners: HashMap<SlotId, ThreadId>,
    waiting: HashMap<ThreadId, SlotId>,
}

/// 单例初始化跟踪器
///
/// 两张表放在同一把锁下，任意两次检查之间有全序，
/// 两个线程同时等待对方时，后检查的一方一定能看到完整的链。
#[derive(Debug, Default)]
pub struct InitTracker {
    graph: Mutex<WaitGraph>,
}

impl InitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记当前线程将等待 `slot`
    ///
    /// 等待会回到当前线程时返回 `None`，此时不做登记。
    pub fn wait_for(&self, slot: SlotId) -> Option<WaitGuard<'_>> {
        let current = thread::current().id();
        let mut graph = self.graph.lock();

        let mut next = graph.owners.get(&slot).copied();
        for _ in 0..=graph.waiting.len() {
            let Some(owner) = next else {
                break;
            };
            if owner == current {
                return None;
            }
            next = graph
                .waiting
                .get(&owner)
                .and_then(|waited| graph.owners.get(waited))
                .copied();
        }

        graph.waiting.insert(current, slot);
        Some(WaitGuard {
            tracker: self,
            thread: current,
            slot,
        })
    }

    /// 当前线程开始初始化 `slot`，守卫释放时清除负责关系
    pub fn claim(&self, slot: SlotId) -> ClaimGuard<'_> {
        let current = thread::current().id();
        let mut graph = self.graph.lock();
        graph.waiting.remove(&current);
        graph.owners.insert(slot, current);
        ClaimGuard {
            tracker: self,
            thread: current,
            slot,
        }
    }

    /// 正在初始化的槽位数量
    pub fn in_flight(&self) -> usize {
        self.graph.lock().owners.len()
    }
}

/// 等待登记守卫
#[derive(Debug)]
pub struct WaitGuard<'a> {
    tracker: &'a InitTracker,
    thread: ThreadId,
    slot: SlotId,
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        let mut graph = self.tracker.graph.lock();
        if graph.waiting.get(&self.thread) == Some(&self.slot) {
            graph.waiting.remove(&self.thread);
        }
    }
}

/// 初始化负责关系守卫
#[derive(Debug)]
pub struct ClaimGuard<'a> {
    tracker: &'a InitTracker,
    thread: ThreadId,
    slot: SlotId,
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        let mut graph = self.tracker.graph.lock();
        if graph.owners.get(&self.slot) == Some(&self.thread) {
            graph.owners.remove(&self.slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    struct Left;
    struct Right;

    fn slot<T: 'static>(scope: uuid::Uuid) -> SlotId {
        (TypeId::of::<T>(), scope)
    }

    #[test]
    fn test_wait_on_free_slot() {
        let tracker = InitTracker::new();
        let scope = uuid::Uuid::new_v4();

        let waiting = tracker.wait_for(slot::<Left>(scope));
        assert!(waiting.is_some());

        let claim = tracker.claim(slot::<Left>(scope));
        assert_eq!(tracker.in_flight(), 1);
        drop(claim);
        drop(waiting);
        assert_eq!(tracker.in_flight(), 0);
    }

    #[test]
    fn test_wait_closing_cycle_is_refused() {
        let tracker = InitTracker::new();
        let scope = uuid::Uuid::new_v4();
        let barrier = Barrier::new(2);

        let _right = tracker.claim(slot::<Right>(scope));
        std::thread::scope(|s| {
            s.spawn(|| {
                let _left = tracker.claim(slot::<Left>(scope));
                let waiting = tracker.wait_for(slot::<Right>(scope));
                assert!(waiting.is_some());
                barrier.wait();
                barrier.wait();
            });

            barrier.wait();
            assert!(tracker.wait_for(slot::<Left>(scope)).is_none());
            barrier.wait();
        });

        assert_eq!(tracker.in_flight(), 1);
        // 对方线程已结束，不再构成循环
        assert!(tracker.wait_for(slot::<Left>(scope)).is_some());
    }

    #[test]
    fn test_other_scope_is_independent() {
        let tracker = InitTracker::new();
        let _claim = tracker.claim(slot::<Left>(uuid::Uuid::new_v4()));

        assert!(tracker.wait_for(slot::<Left>(uuid::Uuid::new_v4())).is_some());
    }
}
