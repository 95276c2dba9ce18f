// src/main.rs
//
// Demo: a producer thread streams a stereo sine into the queue while a
// consumer thread drains it, both polling with a fixed retry interval.

use std::f32::consts::TAU;
use std::thread;
use std::time::Duration;

use freequeue::{FreeQueue, FreeQueueConfig, log_info, reunite};

const SAMPLE_RATE: f32 = 44_100.0;
const BLOCK_FRAMES: usize = 128;
const TOTAL_BLOCKS: usize = 256;
const RETRY_INTERVAL: Duration = Duration::from_millis(1);

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = FreeQueueConfig::default();
    let queue = FreeQueue::<f32>::with_config(&config);
    log::info!(
        "queue: {} frames x {} channels",
        queue.capacity(),
        queue.channel_count()
    );

    let (mut producer, mut consumer) = queue.split();
    let channels = producer.channel_count();

    // --------------------------------
    // Producer: 440 Hz left, 660 Hz right
    // --------------------------------
    let writer = thread::spawn(move || {
        let mut block = vec![vec![0.0f32; BLOCK_FRAMES]; channels];
        let mut frame = 0usize;
        let mut retries = 0usize;

        for _ in 0..TOTAL_BLOCKS {
            for (ch, samples) in block.iter_mut().enumerate() {
                let freq = 440.0 * (1.0 + ch as f32 * 0.5);
                for (i, sample) in samples.iter_mut().enumerate() {
                    let t = (frame + i) as f32 / SAMPLE_RATE;
                    *sample = (TAU * freq * t).sin();
                }
            }
            while !producer.push(&block, BLOCK_FRAMES) {
                retries += 1;
                thread::sleep(RETRY_INTERVAL);
            }
            frame += BLOCK_FRAMES;
        }

        log::info!("producer: {frame} frames written, {retries} retries");
        producer
    });

    // --------------------------------
    // Consumer: track peak level per channel
    // --------------------------------
    let reader = thread::spawn(move || {
        let mut block = vec![vec![0.0f32; BLOCK_FRAMES]; channels];
        let mut peaks = vec![0.0f32; channels];
        let mut frames = 0usize;
        let mut retries = 0usize;

        for _ in 0..TOTAL_BLOCKS {
            while consumer.pull(&mut block, BLOCK_FRAMES) == 0 {
                retries += 1;
                thread::sleep(RETRY_INTERVAL);
            }
            for (peak, samples) in peaks.iter_mut().zip(&block) {
                *peak = samples.iter().fold(*peak, |acc, s| acc.max(s.abs()));
            }
            frames += BLOCK_FRAMES;
        }

        log::info!("consumer: {frames} frames read, {retries} retries, peaks {peaks:?}");
        consumer
    });

    let (Ok(producer), Ok(consumer)) = (writer.join(), reader.join()) else {
        log::error!("worker thread panicked");
        return;
    };

    match reunite(producer, consumer) {
        Ok(mut queue) => {
            log_info(&queue);
            queue.clear();
        }
        Err(_) => log::error!("handles belong to different queues"),
    }

    println!("Demo completed.");
}
