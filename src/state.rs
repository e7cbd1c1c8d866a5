//! Internal synchronization state for the initialization gate.
//!
//! The state is packed into a single `AtomicU8`:
//! - Bit 0: DONE - the runtime behind the gate is ready
//! - Bit 1: LOCKED - some request is inside the initialization critical section
//! - Bit 2: WAITING - at least one request is parked waiting for the lock
//!
//! Reading DONE is the request fast path and never touches the lock. Async
//! waiters park on a `tokio::sync::Notify`, which is woken whenever the lock is
//! released with WAITING set.

use core::mem;
use core::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::Notify;

/// Atomic state of an [`InitGuard`](crate::InitGuard).
pub(crate) struct GateState {
   bits: AtomicU8,
   waiters: Notify,
}

impl GateState {
   /// Bit flag: initialization completed.
   const DONE: u8 = 1;
   /// Bit flag: initialization in progress.
   const LOCKED: u8 = 2;
   /// Bit flag: at least one request is waiting for the lock.
   const WAITING: u8 = 4;

   /// Creates a new state representing an uninitialized gate.
   #[inline]
   pub(crate) fn new() -> Self {
      Self {
         bits: AtomicU8::new(0),
         waiters: Notify::new(),
      }
   }

   /// Wakes every request parked in `lock_async`.
   #[inline]
   fn notify_all(&self) {
      self.waiters.notify_waiters();
   }

   /// Sets the state to DONE and wakes waiters based on the *previous* state.
   /// Returns `true` if the state was *not* previously DONE.
   ///
   /// Release ordering publishes every effect of the initializer to requests
   /// that later observe DONE with an Acquire load.
   #[inline]
   pub(crate) fn set_done(&self) -> bool {
      let prev_state = self.bits.swap(Self::DONE, Ordering::Release);
      if prev_state & Self::WAITING != 0 {
         self.notify_all();
      }
      prev_state & Self::DONE == 0
   }

   /// Clears DONE/LOCKED/WAITING and wakes waiters based on the *previous* state.
   /// Returns `true` if the state was previously DONE.
   ///
   /// Called when an attempt fails or its future is dropped, so that the next
   /// request (or a woken waiter) can make its own attempt.
   #[inline]
   pub(crate) fn set_uninit(&self) -> bool {
      let prev_state = self.bits.swap(0, Ordering::Release);
      if prev_state & Self::WAITING != 0 {
         self.notify_all();
      }
      prev_state & Self::DONE != 0
   }

   /// Checks if the DONE flag is set.
   #[inline]
   pub(crate) fn is_done(&self, ordering: Ordering) -> bool {
      self.bits.load(ordering) & Self::DONE != 0
   }

   /// Checks if the LOCKED flag is set.
   #[inline]
   pub(crate) fn is_locked(&self) -> bool {
      self.bits.load(Ordering::Relaxed) & Self::LOCKED != 0
   }

   /// Tries to acquire the initialization lock once.
   ///
   /// Returns:
   ///   - `Ok(None)`: gate is already DONE.
   ///   - `Ok(Some(guard))`: lock acquired.
   ///   - `Err(current_state)`: lock is held elsewhere; WAITING has been set.
   #[inline]
   fn lock_step(&self) -> Result<Option<GateGuard<'_>>, u8> {
      loop {
         let current_state = self.bits.load(Ordering::Acquire);
         if current_state & Self::DONE != 0 {
            return Ok(None);
         }

         if current_state & Self::LOCKED == 0 {
            match self.bits.compare_exchange_weak(
               current_state,
               current_state | Self::LOCKED,
               Ordering::Acquire,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Ok(Some(GateGuard::new(self))),
               Err(_) => {
                  std::hint::spin_loop();
                  continue;
               }
            }
         }

         if current_state & Self::WAITING == 0 {
            let new_state = current_state | Self::WAITING;
            match self.bits.compare_exchange_weak(
               current_state,
               new_state,
               Ordering::Relaxed,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Err(new_state),
               Err(_) => {
                  std::hint::spin_loop();
                  continue;
               }
            }
         }
         return Err(current_state);
      }
   }

   /// Acquires the initialization lock, suspending while another request holds it.
   ///
   /// Returns `Some(guard)` if the lock was acquired (gate not yet DONE).
   /// Returns `None` if the gate became DONE while waiting.
   pub(crate) async fn lock_async(&self) -> Option<GateGuard<'_>> {
      loop {
         // Registered before the state check so a release between the check
         // and the await cannot be missed.
         let notified = self.waiters.notified();
         match self.lock_step() {
            Ok(guard) => return guard,
            Err(_) => notified.await,
         }
      }
   }
}

/// RAII guard for the initialization critical section.
///
/// Dropping it resets the gate to uninitialized and wakes waiters. It must be
/// `commit()`ed to mark the gate DONE.
pub(crate) struct GateGuard<'a> {
   state: &'a GateState,
}

impl<'a> GateGuard<'a> {
   /// Creates a new guard. Assumes LOCKED is already set on `state`.
   #[inline(always)]
   const fn new(state: &'a GateState) -> Self {
      Self { state }
   }

   /// Marks the gate DONE, consumes the guard, and wakes waiters.
   #[inline(always)]
   pub(crate) fn commit(self) -> bool {
      let success = self.state.set_done();
      mem::forget(self);
      success
   }
}

impl Drop for GateGuard<'_> {
   #[inline(always)]
   fn drop(&mut self) {
      self.state.set_uninit();
   }
}
