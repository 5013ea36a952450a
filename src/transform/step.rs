use super::map::StepMap;
use super::replace_step::{ReplaceAroundStep, ReplaceStep};
use super::structure::{LiftStep, SplitStep, Wrapper};
use crate::model::{Attrs, ModelError, Node, ReplaceError, Schema, SliceJson};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    Replace(#[from] ReplaceError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("structure replace would overwrite content")]
    StructureOverwrite,
    #[error("gap is not a flat range")]
    GapNotFlat,
    #[error("content does not fit in gap")]
    GapDoesNotFit,
    #[error("cannot split at this position")]
    CannotSplit,
    #[error("step positions are out of order")]
    Unordered,
    #[error("step produced an invalid document: {0}")]
    Invalid(ModelError),
}

/// One atomic, invertible document change.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Replace(ReplaceStep),
    ReplaceAround(ReplaceAroundStep),
    Split(SplitStep),
    Lift(LiftStep),
}

impl Step {
    pub fn apply(&self, doc: &Node) -> Result<Node, StepError> {
        match self {
            Step::Replace(step) => step.apply(doc),
            Step::ReplaceAround(step) => step.apply(doc),
            Step::Split(step) => step.apply(doc),
            Step::Lift(step) => step.apply(doc),
        }
    }

    pub fn get_map(&self) -> StepMap {
        match self {
            Step::Replace(step) => step.get_map(),
            Step::ReplaceAround(step) => step.get_map(),
            Step::Split(step) => step.get_map(),
            Step::Lift(step) => step.get_map(),
        }
    }

    /// The step that undoes this one; `doc` is the document this step was
    /// applied to.
    pub fn invert(&self, doc: &Node) -> Result<Step, StepError> {
        Ok(match self {
            Step::Replace(step) => Step::Replace(step.invert(doc)?),
            Step::ReplaceAround(step) => Step::ReplaceAround(step.invert(doc)?),
            Step::Split(step) => Step::Replace(step.invert()),
            Step::Lift(step) => Step::ReplaceAround(step.invert(doc)?),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Step::Replace(_) => "replace",
            Step::ReplaceAround(_) => "replaceAround",
            Step::Split(_) => "split",
            Step::Lift(_) => "lift",
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(StepJson::from(self)).unwrap_or(Value::Null)
    }

    pub fn from_json(schema: &Schema, value: &Value) -> Result<Step, StepError> {
        let json = StepJson::deserialize(value).map_err(ModelError::from)?;
        json.into_step(schema)
    }
}

impl From<ReplaceStep> for Step {
    fn from(step: ReplaceStep) -> Self {
        Step::Replace(step)
    }
}

impl From<ReplaceAroundStep> for Step {
    fn from(step: ReplaceAroundStep) -> Self {
        Step::ReplaceAround(step)
    }
}

impl From<SplitStep> for Step {
    fn from(step: SplitStep) -> Self {
        Step::Split(step)
    }
}

impl From<LiftStep> for Step {
    fn from(step: LiftStep) -> Self {
        Step::Lift(step)
    }
}

fn is_false(b: &bool) -> bool {
    !b
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplaceAroundJson {
    from: usize,
    to: usize,
    gap_from: usize,
    gap_to: usize,
    #[serde(default)]
    slice: SliceJson,
    insert: usize,
    #[serde(default, skip_serializing_if = "is_false")]
    structure: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct WrapperJson {
    #[serde(rename = "type")]
    ty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attrs: Option<Attrs>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stepType", rename_all = "camelCase", rename_all_fields = "camelCase")]
enum StepJson {
    Replace {
        from: usize,
        to: usize,
        #[serde(default)]
        slice: SliceJson,
        #[serde(default, skip_serializing_if = "is_false")]
        structure: bool,
    },
    ReplaceAround(ReplaceAroundJson),
    Split {
        pos: usize,
        depth: usize,
        #[serde(default)]
        types_after: Vec<Option<WrapperJson>>,
    },
    Lift {
        range_from: usize,
        range_to: usize,
        depth: usize,
        target: usize,
        around: ReplaceAroundJson,
    },
}

impl From<&ReplaceAroundStep> for ReplaceAroundJson {
    fn from(step: &ReplaceAroundStep) -> Self {
        Self {
            from: step.from,
            to: step.to,
            gap_from: step.gap_from,
            gap_to: step.gap_to,
            slice: SliceJson::from(&step.slice),
            insert: step.insert,
            structure: step.structure,
        }
    }
}

impl ReplaceAroundJson {
    fn into_step(self, schema: &Schema) -> Result<ReplaceAroundStep, StepError> {
        Ok(ReplaceAroundStep::new(
            self.from,
            self.to,
            self.gap_from,
            self.gap_to,
            self.slice.to_slice(schema)?,
            self.insert,
            self.structure,
        ))
    }
}

impl From<&Step> for StepJson {
    fn from(step: &Step) -> Self {
        match step {
            Step::Replace(step) => StepJson::Replace {
                from: step.from,
                to: step.to,
                slice: SliceJson::from(&step.slice),
                structure: step.structure,
            },
            Step::ReplaceAround(step) => StepJson::ReplaceAround(step.into()),
            Step::Split(step) => StepJson::Split {
                pos: step.pos,
                depth: step.depth,
                types_after: step
                    .types_after
                    .iter()
                    .map(|wrapper| {
                        wrapper.as_ref().map(|w| WrapperJson {
                            ty: w.ty.name().to_string(),
                            attrs: w.attrs.clone(),
                        })
                    })
                    .collect(),
            },
            Step::Lift(step) => StepJson::Lift {
                range_from: step.range_from,
                range_to: step.range_to,
                depth: step.depth,
                target: step.target,
                around: (&step.around).into(),
            },
        }
    }
}

impl StepJson {
    fn into_step(self, schema: &Schema) -> Result<Step, StepError> {
        Ok(match self {
            StepJson::Replace {
                from,
                to,
                slice,
                structure,
            } => Step::Replace(ReplaceStep {
                from,
                to,
                slice: slice.to_slice(schema)?,
                structure,
            }),
            StepJson::ReplaceAround(around) => Step::ReplaceAround(around.into_step(schema)?),
            StepJson::Split {
                pos,
                depth,
                types_after,
            } => {
                let types_after = types_after
                    .into_iter()
                    .map(|wrapper| {
                        wrapper
                            .map(|w| -> Result<Wrapper, ModelError> {
                                let ty = schema
                                    .node_type(&w.ty)
                                    .ok_or_else(|| ModelError::UnknownNodeType(w.ty.clone()))?;
                                Ok(Wrapper { ty, attrs: w.attrs })
                            })
                            .transpose()
                    })
                    .collect::<Result<Vec<_>, ModelError>>()?;
                Step::Split(SplitStep::new(pos, depth, types_after))
            }
            StepJson::Lift {
                range_from,
                range_to,
                depth,
                target,
                around,
            } => Step::Lift(LiftStep {
                range_from,
                range_to,
                depth,
                target,
                around: around.into_step(schema)?,
            }),
        })
    }
}
