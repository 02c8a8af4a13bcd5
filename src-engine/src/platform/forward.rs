//! Lock-free capture -> playback sample forwarding.
//!
//! The capture callback pushes whole interleaved frames into an `rtrb` ring;
//! the playback callback pops them in arrival order, maps channels and applies
//! the link gain. Neither side allocates or locks.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use rtrb::{Consumer, Producer, RingBuffer};

/// Playback gain shared between the control thread and the audio callback.
#[derive(Debug)]
pub struct Gain(AtomicU32);

impl Gain {
    pub fn new(level: f32) -> Self {
        Self(AtomicU32::new(level.clamp(0.0, 1.0).to_bits()))
    }

    pub fn set(&self, level: f32) {
        self.0.store(level.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// Counters updated from the audio callbacks.
#[derive(Debug, Default)]
pub struct ForwardStats {
    /// Captured frames discarded because the ring was full
    pub dropped_frames: AtomicU64,
    /// Playback frames filled with silence because the ring was empty
    pub underrun_frames: AtomicU64,
}

/// Capture half of the forwarding queue.
pub struct ForwardProducer {
    producer: Producer<f32>,
    channels: usize,
    stats: Arc<ForwardStats>,
}

impl ForwardProducer {
    /// Queue interleaved samples. Trailing partial frames are ignored.
    ///
    /// Returns the number of frames queued.
    pub fn push_interleaved(&mut self, data: &[f32]) -> usize {
        let mut queued = 0;
        for frame in data.chunks_exact(self.channels) {
            if self.producer.slots() < self.channels {
                let dropped = (data.len() / self.channels - queued) as u64;
                self.stats.dropped_frames.fetch_add(dropped, Ordering::Relaxed);
                break;
            }
            for &sample in frame {
                // Cannot fail: free slots were checked above.
                let _ = self.producer.push(sample);
            }
            queued += 1;
        }
        queued
    }
}

/// Playback half of the forwarding queue.
pub struct ForwardConsumer {
    consumer: Consumer<f32>,
    in_channels: usize,
    out_channels: usize,
    gain: Arc<Gain>,
    frame: Vec<f32>,
    stats: Arc<ForwardStats>,
}

impl ForwardConsumer {
    /// Fill an interleaved playback buffer.
    ///
    /// Output channel `c` takes input channel `c % in_channels`. Missing input
    /// becomes silence. Returns the number of frames taken from the queue.
    pub fn fill_interleaved(&mut self, out: &mut [f32]) -> usize {
        let gain = self.gain.get();
        let mut forwarded = 0;
        let mut silent = 0u64;

        for out_frame in out.chunks_exact_mut(self.out_channels) {
            if self.consumer.slots() < self.in_channels {
                out_frame.fill(0.0);
                silent += 1;
                continue;
            }
            for slot in self.frame.iter_mut() {
                *slot = self.consumer.pop().unwrap_or(0.0);
            }
            for (c, sample) in out_frame.iter_mut().enumerate() {
                *sample = self.frame[c % self.in_channels] * gain;
            }
            forwarded += 1;
        }

        if silent > 0 {
            self.stats
                .underrun_frames
                .fetch_add(silent, Ordering::Relaxed);
        }
        forwarded
    }
}

/// Create a forwarding queue holding up to `capacity_frames` input frames.
pub fn forwarding_queue(
    capacity_frames: usize,
    in_channels: u16,
    out_channels: u16,
    gain: Arc<Gain>,
) -> (ForwardProducer, ForwardConsumer, Arc<ForwardStats>) {
    let in_channels = usize::from(in_channels.max(1));
    let out_channels = usize::from(out_channels.max(1));
    let (producer, consumer) = RingBuffer::<f32>::new(capacity_frames.max(1) * in_channels);
    let stats = Arc::new(ForwardStats::default());

    (
        ForwardProducer {
            producer,
            channels: in_channels,
            stats: stats.clone(),
        },
        ForwardConsumer {
            consumer,
            in_channels,
            out_channels,
            gain,
            frame: vec![0.0; in_channels],
            stats: stats.clone(),
        },
        stats,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereo_passthrough_keeps_order() {
        let gain = Arc::new(Gain::new(1.0));
        let (mut tx, mut rx, _) = forwarding_queue(16, 2, 2, gain);

        assert_eq!(tx.push_interleaved(&[0.1, 0.2, 0.3, 0.4]), 2);
        let mut out = [0.0f32; 4];
        assert_eq!(rx.fill_interleaved(&mut out), 2);
        assert_eq!(out, [0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_mono_is_duplicated_to_stereo() {
        let gain = Arc::new(Gain::new(1.0));
        let (mut tx, mut rx, _) = forwarding_queue(16, 1, 2, gain);

        tx.push_interleaved(&[0.5, -0.5]);
        let mut out = [0.0f32; 4];
        rx.fill_interleaved(&mut out);
        assert_eq!(out, [0.5, 0.5, -0.5, -0.5]);
    }

    #[test]
    fn test_gain_is_applied_and_updatable() {
        let gain = Arc::new(Gain::new(0.5));
        let (mut tx, mut rx, _) = forwarding_queue(16, 2, 2, gain.clone());

        tx.push_interleaved(&[1.0, 1.0, 1.0, 1.0]);
        let mut out = [0.0f32; 2];
        rx.fill_interleaved(&mut out);
        assert_eq!(out, [0.5, 0.5]);

        gain.set(0.0);
        rx.fill_interleaved(&mut out);
        assert_eq!(out, [0.0, 0.0]);
    }

    #[test]
    fn test_underrun_plays_silence() {
        let gain = Arc::new(Gain::new(1.0));
        let (mut tx, mut rx, stats) = forwarding_queue(16, 2, 2, gain);

        tx.push_interleaved(&[0.25, 0.25]);
        let mut out = [1.0f32; 6];
        assert_eq!(rx.fill_interleaved(&mut out), 1);
        assert_eq!(out, [0.25, 0.25, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(stats.underrun_frames.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_overflow_drops_newest_frames() {
        let gain = Arc::new(Gain::new(1.0));
        let (mut tx, mut rx, stats) = forwarding_queue(2, 1, 1, gain);

        assert_eq!(tx.push_interleaved(&[0.1, 0.2, 0.3, 0.4]), 2);
        assert_eq!(stats.dropped_frames.load(Ordering::Relaxed), 2);

        let mut out = [0.0f32; 2];
        rx.fill_interleaved(&mut out);
        assert_eq!(out, [0.1, 0.2]);
    }

    #[test]
    fn test_gain_is_clamped() {
        assert_eq!(Gain::new(1.5).get(), 1.0);
        let gain = Gain::new(0.5);
        gain.set(-1.0);
        assert_eq!(gain.get(), 0.0);
    }
}
