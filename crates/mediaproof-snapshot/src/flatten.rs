//! Output flattener: reduce a nested result to atomic comparable units.
//!
//! Flattening is lazy (driven by iteration), finite, depth-first, and
//! order-preserving. Rules, one per [`ResultValue`] variant:
//!
//! 1. `List` — flatten each element in order and concatenate.
//! 2. `Batch` — split along the leading dimension; each frame is a unit.
//! 3. `Buffer` — one unit.
//! 4. `Answer` — keep only `Image` artifacts, in order, and recurse.
//! 5. `Bytes` — passed through unchanged as an opaque unit.
//!
//! Empty lists and empty batches yield nothing; a caller expecting at
//! least one unit must treat an empty sequence as a failure.

use crate::result::{ArtifactKind, AtomicUnit, ResultValue};

/// Flatten a result into a lazy sequence of [`AtomicUnit`]s.
pub fn flatten(value: ResultValue) -> Flattened {
    Flattened { stack: vec![value] }
}

/// Iterator over the atomic units of a result, in result order.
#[derive(Debug)]
pub struct Flattened {
    // Pending values, depth-first: the next value to visit is on top, so
    // children are pushed in reverse.
    stack: Vec<ResultValue>,
}

impl Iterator for Flattened {
    type Item = AtomicUnit;

    fn next(&mut self) -> Option<AtomicUnit> {
        while let Some(value) = self.stack.pop() {
            match value {
                ResultValue::List(items) => {
                    self.stack.extend(items.into_iter().rev());
                }
                ResultValue::Batch(batch) => {
                    self.stack.extend(
                        batch
                            .into_frames()
                            .into_iter()
                            .rev()
                            .map(ResultValue::Buffer),
                    );
                }
                ResultValue::Buffer(buffer) => return Some(AtomicUnit::Buffer(buffer)),
                ResultValue::Answer(answer) => {
                    self.stack.extend(
                        answer
                            .artifacts
                            .into_iter()
                            .filter(|artifact| artifact.kind == ArtifactKind::Image)
                            .map(|artifact| artifact.value)
                            .rev(),
                    );
                }
                ResultValue::Bytes(bytes) => return Some(AtomicUnit::Bytes(bytes)),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{Answer, Artifact};
    use mediaproof_image::{FrameBatch, PixelBuffer};

    fn frame(value: f32) -> PixelBuffer {
        PixelBuffer::filled(2, 2, 3, value).unwrap()
    }

    fn unit_values(value: ResultValue) -> Vec<f32> {
        flatten(value)
            .map(|unit| match unit {
                AtomicUnit::Buffer(buffer) => buffer.data()[0],
                AtomicUnit::Bytes(_) => panic!("expected buffer unit"),
            })
            .collect()
    }

    #[test]
    fn nested_lists_preserve_order() {
        let value = ResultValue::List(vec![
            ResultValue::List(vec![
                ResultValue::Buffer(frame(0.1)),
                ResultValue::Buffer(frame(0.2)),
            ]),
            ResultValue::Buffer(frame(0.3)),
            ResultValue::List(vec![ResultValue::Buffer(frame(0.4))]),
        ]);
        assert_eq!(unit_values(value), vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn batch_splits_into_frames() {
        let batch = FrameBatch::new(vec![frame(0.1), frame(0.2), frame(0.3)]).unwrap();
        assert_eq!(unit_values(ResultValue::Batch(batch)), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn single_frame_batch_is_one_unit() {
        let batch = FrameBatch::new(vec![frame(0.5)]).unwrap();
        assert_eq!(unit_values(ResultValue::Batch(batch)), vec![0.5]);
    }

    #[test]
    fn answer_keeps_only_image_artifacts() {
        let answer = Answer::new("answer-1")
            .with_artifact(Artifact::text("safety classifier output"))
            .with_artifact(Artifact::image(ResultValue::Buffer(frame(0.1))))
            .with_artifact(Artifact::text("metadata"))
            .with_artifact(Artifact::image(ResultValue::Buffer(frame(0.2))));
        assert_eq!(unit_values(ResultValue::Answer(answer)), vec![0.1, 0.2]);
    }

    #[test]
    fn empty_list_yields_nothing() {
        assert_eq!(flatten(ResultValue::List(vec![])).count(), 0);
    }

    #[test]
    fn answer_with_no_images_yields_nothing() {
        let answer = Answer::new("answer-2").with_artifact(Artifact::text("only text"));
        assert_eq!(flatten(ResultValue::Answer(answer)).count(), 0);
    }

    #[test]
    fn bytes_pass_through_unchanged() {
        let payload = vec![1u8, 2, 3];
        let units: Vec<AtomicUnit> = flatten(ResultValue::Bytes(payload.clone())).collect();
        assert_eq!(units, vec![AtomicUnit::Bytes(payload)]);
    }

    #[test]
    fn answers_nest_inside_lists() {
        let inner = Answer::new("inner")
            .with_artifact(Artifact::image(ResultValue::Buffer(frame(0.2))));
        let value = ResultValue::List(vec![
            ResultValue::Buffer(frame(0.1)),
            ResultValue::Answer(inner),
            ResultValue::Buffer(frame(0.3)),
        ]);
        assert_eq!(unit_values(value), vec![0.1, 0.2, 0.3]);
    }
}
