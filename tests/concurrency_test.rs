//! Multi-threaded behaviour: blocking handoff, cancellation and stress tests
//! with several producers and consumers.

use bounded_blocking_queue::{BlockingQueue, CancelToken, PutError, QueueOps, TakeError, WakePolicy};
use crossbeam_utils::Backoff;
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const A: i32 = 13;
const B: i32 = 11;
const C: i32 = 19;
const D: i32 = 17;

/// Long enough for a spawned thread to reach its wait
const SETTLE: Duration = Duration::from_millis(50);

fn full_queue() -> Arc<BlockingQueue<Box<i32>>> {
    let queue = Arc::new(BlockingQueue::new(3).unwrap());
    for value in [A, B, C] {
        queue.put(Box::new(value)).unwrap();
    }
    assert_eq!(queue.size(), 3);
    queue
}

#[test]
fn test_take_waits_for_put() {
    let queue = Arc::new(BlockingQueue::<Box<i32>>::new(3).unwrap());

    let taker = {
        let queue = queue.clone();
        thread::spawn(move || queue.take())
    };

    thread::sleep(SETTLE);
    queue.put(Box::new(0)).unwrap();
    assert_eq!(*taker.join().unwrap(), 0);
    assert_eq!(queue.size(), 0);
}

#[test]
fn test_take_waits_for_offer() {
    let queue = Arc::new(BlockingQueue::<Box<i32>>::new(1).unwrap());

    let taker = {
        let queue = queue.clone();
        thread::spawn(move || queue.take())
    };

    thread::sleep(SETTLE);
    let backoff = Backoff::new();
    let mut element = Box::new(D);
    // The taker may briefly hold the lock while waking up.
    while let Err(e) = queue.offer(element) {
        assert!(e.is_would_block());
        element = e.into_inner();
        backoff.snooze();
    }
    assert_eq!(*taker.join().unwrap(), D);
}

#[test]
fn test_put_waits_for_take() {
    let queue = full_queue();

    let putter = {
        let queue = queue.clone();
        thread::spawn(move || queue.put(Box::new(D)))
    };

    thread::sleep(SETTLE);
    assert_eq!(queue.size(), 3);
    assert_eq!(*queue.take(), A);
    assert!(putter.join().unwrap().is_ok());
    assert_eq!(queue.size(), 3);

    for value in [B, C, D] {
        assert_eq!(*queue.take(), value);
    }
    assert_eq!(queue.size(), 0);
}

#[test]
fn test_put_waits_for_poll() {
    let queue = full_queue();

    let putter = {
        let queue = queue.clone();
        thread::spawn(move || queue.put(Box::new(D)))
    };

    thread::sleep(SETTLE);
    let backoff = Backoff::new();
    let head = loop {
        match queue.poll() {
            Some(head) => break head,
            None => backoff.snooze(),
        }
    };
    assert_eq!(*head, A);
    assert!(putter.join().unwrap().is_ok());
    assert_eq!(queue.drain().into_iter().map(|b| *b).collect::<Vec<_>>(), vec![B, C, D]);
}

#[test]
fn test_cancel_blocked_take() {
    let queue = Arc::new(BlockingQueue::<Box<i32>>::new(3).unwrap());
    let token = CancelToken::new();

    let taker = {
        let queue = queue.clone();
        let token = token.clone();
        thread::spawn(move || queue.take_cancellable(&token))
    };

    thread::sleep(SETTLE);
    token.cancel();
    assert!(matches!(taker.join().unwrap(), Err(TakeError::Cancelled)));
    assert_eq!(queue.size(), 0);

    // The queue keeps working after a cancelled wait.
    queue.put(Box::new(A)).unwrap();
    assert_eq!(*queue.take(), A);
}

#[test]
fn test_cancel_blocked_put_returns_element() {
    let queue = full_queue();
    let token = CancelToken::new();

    let putter = {
        let queue = queue.clone();
        let token = token.clone();
        thread::spawn(move || queue.put_cancellable(Box::new(D), &token))
    };

    thread::sleep(SETTLE);
    token.cancel();
    match putter.join().unwrap() {
        Err(PutError::Cancelled(element)) => assert_eq!(*element, D),
        other => panic!("expected cancellation, got {other:?}"),
    }
    assert_eq!(queue.size(), 3);

    for value in [A, B, C] {
        assert_eq!(*queue.take(), value);
    }
}

#[test]
fn test_one_token_cancels_many_waiters() {
    let queue = Arc::new(BlockingQueue::<u32>::new(2).unwrap());
    let token = CancelToken::new();

    let takers: Vec<_> = (0..4)
        .map(|_| {
            let queue = queue.clone();
            let token = token.clone();
            thread::spawn(move || queue.take_cancellable(&token))
        })
        .collect();

    thread::sleep(SETTLE);
    token.cancel();
    for taker in takers {
        assert_eq!(taker.join().unwrap(), Err(TakeError::Cancelled));
    }
    assert_eq!(queue.size(), 0);
}

#[test]
fn test_cancel_other_token_does_not_wake() {
    let queue = Arc::new(BlockingQueue::<u32>::new(1).unwrap());
    let ours = CancelToken::new();
    let theirs = CancelToken::new();

    let taker = {
        let queue = queue.clone();
        let ours = ours.clone();
        thread::spawn(move || queue.take_cancellable(&ours))
    };

    thread::sleep(SETTLE);
    theirs.cancel();
    thread::sleep(SETTLE);
    assert!(!taker.is_finished());

    queue.put(7).unwrap();
    assert_eq!(taker.join().unwrap(), Ok(7));
}

#[test]
fn test_put_timeout_unblocked_by_take() {
    let queue = Arc::new(BlockingQueue::<u32>::new(1).unwrap());
    queue.put(1).unwrap();

    let putter = {
        let queue = queue.clone();
        thread::spawn(move || queue.put_timeout(2, Duration::from_secs(10)))
    };

    thread::sleep(SETTLE);
    assert_eq!(queue.take(), 1);
    assert!(putter.join().unwrap().is_ok());
    assert_eq!(queue.take(), 2);
}

/// One producer, one consumer: the consumer sees every value in order
fn single_producer_single_consumer<Q>(queue: Q, n: u32)
where
    Q: QueueOps<Box<u32>> + Clone + Send + 'static,
{
    let consumer = {
        let queue = queue.clone();
        thread::spawn(move || (0..n).all(|i| *queue.take() == i))
    };
    let producer = {
        let queue = queue.clone();
        thread::spawn(move || {
            for i in 0..n {
                queue.put(Box::new(i)).unwrap();
            }
        })
    };

    producer.join().unwrap();
    assert!(consumer.join().unwrap(), "consumer saw values out of order");
    assert_eq!(queue.size(), 0);
}

#[test]
fn test_multithread() {
    single_producer_single_consumer(Arc::new(BlockingQueue::new(10).unwrap()), 200_000);
}

#[test]
fn test_multithread_broadcast() {
    let queue = BlockingQueue::with_wake_policy(10, WakePolicy::All).unwrap();
    single_producer_single_consumer(Arc::new(queue), 100_000);
}

/// Producers insert distinct values until cancelled, consumers take until
/// cancelled; nothing may be lost or duplicated.
fn stress(policy: WakePolicy) {
    const PRODUCERS: usize = 3;
    const CONSUMERS: usize = 5;

    let queue = Arc::new(BlockingQueue::<usize>::with_wake_policy(10, policy).unwrap());
    let stop_producers = CancelToken::new();
    let stop_consumers = CancelToken::new();
    let barrier = Arc::new(Barrier::new(PRODUCERS + CONSUMERS));

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let queue = queue.clone();
            let token = stop_consumers.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let mut taken = Vec::new();
                while let Ok(value) = queue.take_cancellable(&token) {
                    taken.push(value);
                }
                taken
            })
        })
        .collect();

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = queue.clone();
            let token = stop_producers.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let mut put = 0usize;
                loop {
                    // A ready put completes even on a cancelled token.
                    if token.is_cancelled() {
                        return put;
                    }
                    let value = put * PRODUCERS + p;
                    match queue.put_cancellable(value, &token) {
                        Ok(()) => put += 1,
                        Err(e) => {
                            assert!(e.is_cancelled());
                            assert_eq!(e.into_inner(), value);
                            return put;
                        }
                    }
                }
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(300));

    // cancel producers first
    stop_producers.cancel();
    let produced: usize = producers.into_iter().map(|h| h.join().unwrap()).sum();

    let backoff = Backoff::new();
    while !queue.is_empty() {
        backoff.snooze();
    }
    stop_consumers.cancel();

    let mut seen = HashSet::with_capacity(produced);
    let mut total = 0usize;
    for handle in consumers {
        for value in handle.join().unwrap() {
            assert!(seen.insert(value), "value {value} taken twice");
            total += 1;
        }
    }

    assert!(produced > 0);
    assert_eq!(total, produced);
    assert_eq!(queue.size(), 0);
}

#[test]
fn test_multithread2() {
    stress(WakePolicy::One);
}

#[test]
fn test_multithread2_broadcast() {
    stress(WakePolicy::All);
}

#[test]
fn test_nonblocking_multithread() {
    const THREADS: usize = 4;
    const PER_THREAD: usize = 10_000;

    let queue = Arc::new(BlockingQueue::<usize>::new(8).unwrap());

    let producers: Vec<_> = (0..THREADS)
        .map(|t| {
            let queue = queue.clone();
            thread::spawn(move || {
                let backoff = Backoff::new();
                for i in 0..PER_THREAD {
                    let mut value = t * PER_THREAD + i;
                    while let Err(e) = queue.offer(value) {
                        value = e.into_inner();
                        backoff.snooze();
                    }
                    backoff.reset();
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..THREADS)
        .map(|_| {
            let queue = queue.clone();
            thread::spawn(move || {
                let backoff = Backoff::new();
                let mut sum = 0usize;
                for _ in 0..PER_THREAD {
                    loop {
                        if let Some(value) = queue.poll() {
                            sum += value;
                            backoff.reset();
                            break;
                        }
                        backoff.snooze();
                    }
                }
                sum
            })
        })
        .collect();

    for handle in producers {
        handle.join().unwrap();
    }
    let total: usize = consumers.into_iter().map(|h| h.join().unwrap()).sum();

    let n = THREADS * PER_THREAD;
    assert_eq!(total, n * (n - 1) / 2);
    assert_eq!(queue.size(), 0);
}
