//! A filter made of filters.

use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::filter::PassInfo;
use crate::registry::{FilterRegistry, LoadOptions};
use crate::state::{CpuPipelineState, PipelineState};
use crate::{Filter, FilterError, FilterResult, shaders};

/// Runs `sub_filters` in order as one filter.
///
/// On the GPU the children share the chain's pass budget: the composite
/// itself counts as one pass, and reserves the rest for its children.
#[derive(Debug, Default)]
pub struct Composed {
    pub sub_filters: Vec<Box<dyn Filter>>,
}

impl Composed {
    pub const TYPE: &'static str = "Composed";

    pub fn new(sub_filters: Vec<Box<dyn Filter>>) -> Self {
        Self { sub_filters }
    }

    fn sub_records(record: &Value) -> FilterResult<&[Value]> {
        match record.get("subFilters") {
            None => Ok(&[]),
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(FilterError::InvalidRecord(format!("{}: subFilters must be an array", Self::TYPE))),
        }
    }

    pub(crate) fn from_object(registry: &FilterRegistry, record: &Value) -> FilterResult<Self> {
        let sub_filters = Self::sub_records(record)?
            .iter()
            .map(|r| registry.from_object_sync(r))
            .collect::<FilterResult<_>>()?;
        Ok(Self { sub_filters })
    }

    pub(crate) async fn load(registry: &FilterRegistry, record: &Value, options: &LoadOptions) -> FilterResult<Self> {
        let mut sub_filters = Vec::new();
        for r in Self::sub_records(record)? {
            sub_filters.push(registry.from_object(r, options).await?);
        }
        Ok(Self { sub_filters })
    }
}

impl Filter for Composed {
    fn filter_type(&self) -> &'static str {
        Self::TYPE
    }

    fn is_neutral_state(&self) -> bool {
        self.sub_filters.iter().all(|f| f.is_neutral_state())
    }

    fn to_object(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".to_string(), Value::String(Self::TYPE.to_string()));
        map.insert(
            "subFilters".to_string(),
            Value::Array(self.sub_filters.iter().map(|f| f.to_object()).collect()),
        );
        Value::Object(map)
    }

    fn apply_cpu(&self, state: &mut CpuPipelineState<'_>) -> FilterResult<()> {
        for f in &self.sub_filters {
            f.apply_cpu(state)?;
        }
        Ok(())
    }

    fn apply_to(&self, state: &mut PipelineState<'_>) -> FilterResult<()> {
        #[cfg(feature = "wgpu")]
        if let PipelineState::Gpu(gpu) = state {
            gpu.reserve_passes(self.sub_filters.len().saturating_sub(1) as u32);
        }
        for f in &self.sub_filters {
            f.apply_to(state)?;
        }
        Ok(())
    }

    fn gpu_pass_count(&self) -> u32 {
        self.sub_filters.iter().map(|f| f.gpu_pass_count()).sum::<u32>().saturating_sub(1)
    }

    fn fragment_shader(&self, _pass: &PassInfo) -> Cow<'static, str> {
        Cow::Borrowed(shaders::PASSTHROUGH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::test_util::*;
    use crate::filters::{Blur, Brightness, Contrast, Grayscale, Invert};

    #[test]
    fn test_neutral_iff_all_children_neutral() {
        assert_neutral_unchanged(&Composed::default());
        assert_neutral_unchanged(&Composed::new(vec![Box::new(Brightness::new(0.0)), Box::new(Contrast::new(0.0))]));
        let mixed = Composed::new(vec![Box::new(Brightness::new(0.0)), Box::new(Grayscale::default())]);
        assert!(!mixed.is_neutral_state());
    }

    #[test]
    fn test_pass_count_is_children_minus_one() {
        let c = Composed::new(vec![Box::new(Blur::new(0.1)), Box::new(Brightness::new(0.1)), Box::new(Invert::new())]);
        assert_eq!(c.gpu_pass_count(), 3);
        assert_eq!(Composed::default().gpu_pass_count(), 0);
    }

    #[test]
    fn test_children_run_in_order() {
        let img = sample(5, 4);
        let c = Composed::new(vec![Box::new(Brightness::new(0.1)), Box::new(Invert::new())]);
        let expected = run_cpu(&Invert::new(), &run_cpu(&Brightness::new(0.1), &img));
        assert_eq!(run_cpu(&c, &img), expected);
    }

    #[test]
    fn test_nested_record() {
        let inner = Composed::new(vec![Box::new(Invert::new())]);
        let c = Composed::new(vec![Box::new(Brightness::new(0.2)), Box::new(inner)]);
        let record = c.to_object();
        assert_eq!(record["subFilters"][1]["subFilters"][0]["type"], "Invert");
        assert_record_round_trip(&c);
    }

    #[test]
    fn test_rejects_non_array_children() {
        let record = serde_json::json!({ "type": "Composed", "subFilters": 3 });
        assert!(FilterRegistry::global().from_object_sync(&record).is_err());
    }
}
