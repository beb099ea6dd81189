use rtrb::{Consumer, Producer, RingBuffer};

pub struct TapWriter {
    producer: Producer<f32>,
}

pub struct TapReader {
    consumer: Consumer<f32>,
    capacity: usize,
}

/// Creates a wait-free single-producer/single-consumer tap holding at most
/// `capacity` samples.
pub fn new_tap(capacity: usize) -> (TapWriter, TapReader) {
    let (producer, consumer) = RingBuffer::new(capacity);
    (TapWriter { producer }, TapReader { consumer, capacity })
}

impl TapWriter {
    /// Copies `samples` into the tap. When the ring can't take all of them
    /// the oldest part of the incoming slice is dropped, so the analyzer
    /// always sees the most recent audio.
    ///
    /// Returns the number of samples written.
    pub fn push(&mut self, samples: &[f32]) -> usize {
        let available = self.producer.slots();
        if available == 0 || samples.is_empty() {
            return 0;
        }
        let to_write = samples.len().min(available);
        let skip = samples.len() - to_write;
        match self.producer.write_chunk_uninit(to_write) {
            Ok(chunk) => chunk.fill_from_iter(samples[skip..].iter().copied()),
            Err(_) => 0,
        }
    }

    pub fn free_slots(&self) -> usize {
        self.producer.slots()
    }
}

impl TapReader {
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.consumer.slots()
    }

    /// Returns up to `amount` of the newest samples in arrival order.
    /// Anything older than that is consumed and thrown away.
    pub fn latest(&mut self, amount: usize) -> Vec<f32> {
        let mut output = Vec::new();
        self.latest_into(amount, &mut output);
        output
    }

    /// Like [`TapReader::latest`], reusing `output`'s allocation.
    pub fn latest_into(&mut self, amount: usize, output: &mut Vec<f32>) {
        output.clear();
        let wanted = amount.min(self.capacity);
        let available = self.consumer.slots();
        if available == 0 || wanted == 0 {
            return;
        }

        if available > wanted {
            if let Ok(stale) = self.consumer.read_chunk(available - wanted) {
                stale.commit_all();
            }
        }

        let to_read = self.consumer.slots().min(wanted);
        if let Ok(chunk) = self.consumer.read_chunk(to_read) {
            let (first, second) = chunk.as_slices();
            output.extend_from_slice(first);
            output.extend_from_slice(second);
            chunk.commit_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_returns_newest_samples() {
        let (mut writer, mut reader) = new_tap(8);
        writer.push(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        assert_eq!(reader.latest(3), vec![3.0, 4.0, 5.0]);
        assert_eq!(reader.available(), 0);
    }

    #[test]
    fn test_push_drops_oldest_incoming_when_full() {
        let (mut writer, mut reader) = new_tap(4);
        let written = writer.push(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        assert_eq!(written, 4);
        assert_eq!(reader.latest(4), vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_push_into_full_tap_is_noop() {
        let (mut writer, mut reader) = new_tap(2);
        writer.push(&[1.0, 2.0]);

        assert_eq!(writer.push(&[3.0]), 0);
        assert_eq!(reader.latest(2), vec![1.0, 2.0]);
        assert_eq!(writer.free_slots(), 2);
    }

    #[test]
    fn test_latest_on_empty_tap() {
        let (_writer, mut reader) = new_tap(16);
        assert!(reader.latest(8).is_empty());
    }

    #[test]
    fn test_latest_caps_at_capacity() {
        let (mut writer, mut reader) = new_tap(4);
        writer.push(&[1.0, 2.0, 3.0]);
        assert_eq!(reader.latest(100), vec![1.0, 2.0, 3.0]);
    }
}
