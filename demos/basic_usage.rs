use bounded_blocking_queue::{init_tracing, BlockingQueue, CancelToken, TakeError};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

fn main() {
    init_tracing();

    println!("BlockingQueue Rust Example");
    println!("--------------------------\n");

    // Configuration
    const PRODUCERS: usize = 2; // Number of producer threads
    const CONSUMERS: usize = 3; // Number of consumer threads
    const N: u64 = 100_000; // Each producer puts this many elements into the queue
    const CAPACITY: usize = 64; // Queue capacity

    // Create a queue object shared between all producers and consumers
    let queue = Arc::new(BlockingQueue::<Box<u64>>::new(CAPACITY).expect("non-zero capacity"));
    let stop = CancelToken::new();

    println!("Starting {} producers and {} consumers", PRODUCERS, CONSUMERS);
    println!("Each producer will put {} elements", N);
    println!("Queue capacity: {}\n", CAPACITY);

    let start_time = Instant::now();

    // Start the consumers; each runs until the stop token is cancelled
    let consumer_threads: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let q = queue.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                let mut local_sum = 0u64;
                loop {
                    match q.take_cancellable(&stop) {
                        Ok(n) => local_sum += *n,
                        Err(TakeError::Cancelled) => break,
                        Err(TakeError::Timeout) => unreachable!("no deadline was set"),
                    }
                }
                local_sum
            })
        })
        .collect();

    // Start the producers
    let producer_threads: Vec<_> = (0..PRODUCERS)
        .map(|_| {
            let q = queue.clone();
            thread::spawn(move || {
                for n in 1..=N {
                    q.put(Box::new(n)).expect("boxes are never null");
                }
            })
        })
        .collect();

    // Wait for all producers to finish
    for handle in producer_threads {
        handle.join().unwrap();
    }

    // Let the consumers empty the queue, then stop them
    while !queue.is_empty() {
        thread::yield_now();
    }
    stop.cancel();

    let sums: Vec<u64> = consumer_threads
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();
    let total_sum: u64 = sums.iter().sum();

    // The expected sum is N*(N+1)/2 * PRODUCERS
    let expected_sum: u64 = (N * (N + 1) / 2) * PRODUCERS as u64;

    println!("Execution time: {:?}", start_time.elapsed());
    println!("Total sum: {}", total_sum);
    println!("Expected sum: {}", expected_sum);

    if total_sum != expected_sum {
        println!("ERROR: Sum mismatch! Difference: {}", total_sum as i64 - expected_sum as i64);
    } else {
        println!("SUCCESS: All elements were correctly processed.");
    }

    // Show per-consumer stats
    println!("\nPer-consumer statistics:");
    for (i, &sum) in sums.iter().enumerate() {
        println!("Consumer {}: sum = {}", i, sum);
        if sum == 0 {
            println!("WARNING: Consumer {} received no elements!", i);
        }
    }

    match Arc::try_unwrap(queue) {
        Ok(queue) => queue.destroy(Some(&mut |leftover: Box<u64>| drop(leftover))),
        Err(_) => println!("WARNING: queue still shared at exit"),
    }
}
