//! TensorBoard recorder for tdrl.
use log::warn;
use std::path::Path;
use tdrl_core::record::{AggregateRecorder, Record, RecordStorage, RecordValue, Recorder};
use tensorboard_rs::summary_writer::SummaryWriter;

/// Write records to TFRecord.
///
/// Records given to [`AggregateRecorder::store`] are aggregated with
/// [`RecordStorage`] and written on [`AggregateRecorder::flush`], keyed by the
/// environment step.
pub struct TensorboardRecorder {
    writer: SummaryWriter,
    storage: RecordStorage,
    step_key: String,
    ignore_unsupported_value: bool,
}

impl TensorboardRecorder {
    /// Construct a [`TensorboardRecorder`].
    ///
    /// TFRecord will be stored in `logdir`.
    pub fn new<P: AsRef<Path>>(logdir: P) -> Self {
        Self {
            writer: SummaryWriter::new(logdir),
            storage: RecordStorage::new(),
            step_key: "env_steps".to_string(),
            ignore_unsupported_value: true,
        }
    }

    /// Construct a [`TensorboardRecorder`] warning on unsupported record values.
    ///
    /// TFRecord will be stored in `logdir`.
    pub fn new_with_check_unsupported_value<P: AsRef<Path>>(logdir: P) -> Self {
        Self {
            ignore_unsupported_value: false,
            ..Self::new(logdir)
        }
    }
}

impl Recorder for TensorboardRecorder {
    /// Write a given [`Record`] into a TFRecord.
    ///
    /// The step is taken from the scalar under `"env_steps"`. A record without
    /// it is discarded. Only [`RecordValue::Scalar`] is written.
    fn write(&mut self, record: Record) {
        let step = match record.get(&self.step_key) {
            Some(RecordValue::Scalar(v)) => *v as usize,
            _ => {
                warn!("Discarded a record without {}", self.step_key);
                return;
            }
        };

        for (k, v) in record.iter() {
            if *k == self.step_key {
                continue;
            }
            match v {
                RecordValue::Scalar(v) => self.writer.add_scalar(k, *v, step),
                _ => {
                    if !self.ignore_unsupported_value {
                        warn!("Unsupported value: {:?}", (k, v));
                    }
                }
            }
        }
    }
}

impl AggregateRecorder for TensorboardRecorder {
    fn store(&mut self, record: Record) {
        self.storage.store(record);
    }

    fn flush(&mut self, step: i64) {
        let mut record = self.storage.aggregate();
        record.insert(self.step_key.clone(), RecordValue::Scalar(step as f32));
        self.write(record);
        self.writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempdir::TempDir;

    #[test]
    fn test_flush_writes_event_file() -> std::io::Result<()> {
        let dir = TempDir::new("tensorboard_recorder")?;
        let mut recorder = TensorboardRecorder::new(dir.path());
        for v in [1.0, 2.0, 3.0].iter() {
            recorder.store(Record::from_scalar("loss_critic", *v));
        }
        recorder.store(Record::from_slice(&[(
            "tag",
            RecordValue::String("a".to_string()),
        )]));
        recorder.flush(100);
        // Joins the thread writing the event file.
        drop(recorder);

        let files = fs::read_dir(dir.path())?.collect::<Result<Vec<_>, _>>()?;
        assert!(!files.is_empty());
        Ok(())
    }

    #[test]
    fn test_record_without_step_is_discarded() -> std::io::Result<()> {
        let dir = TempDir::new("tensorboard_recorder")?;
        let mut recorder = TensorboardRecorder::new_with_check_unsupported_value(dir.path());
        recorder.write(Record::from_scalar("loss_critic", 1.0));
        recorder.write(Record::from_slice(&[
            ("env_steps", RecordValue::Scalar(10.0)),
            ("obs", RecordValue::Array1(vec![1.0])),
        ]));
        Ok(())
    }
}
