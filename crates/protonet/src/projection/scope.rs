//! Assigning a layer to a logical phase by name prefix and phase rules.

use crate::error::{NetworkError, Result};
use crate::model::{Layer, NameScope, Phase, PhaseRule, PhaseTag};

/// Scope `layer` to `phase` (`None` means every phase).
///
/// Any existing prefix is stripped first. Data layers never get a `train_`
/// prefix and cannot be scoped to deploy.
pub fn assign_phase(layer: &mut Layer, phase: Option<Phase>) -> Result<()> {
    if phase == Some(Phase::Deploy) && layer.is_data() {
        return Err(NetworkError::InvalidArgument(format!(
            "data layer \"{}\" cannot be part of the deploy network",
            layer.name
        )));
    }

    layer.name = layer.visible_name().to_string();

    let (prefix, include) = match phase {
        None => (None, None),
        Some(Phase::TrainVal) => (Some(NameScope::Train), None),
        Some(Phase::Train) => (Some(NameScope::Train), Some(PhaseTag::Train)),
        Some(Phase::Val) => (Some(NameScope::Train), Some(PhaseTag::Test)),
        Some(Phase::Deploy) => (Some(NameScope::Deploy), None),
    };

    if let Some(scope) = prefix {
        if scope == NameScope::Deploy || !layer.is_data() {
            layer.name = format!("{}{}", scope.prefix(), layer.name);
        }
    }

    layer.include = include.map(PhaseRule::new).into_iter().collect();
    layer.exclude.clear();
    Ok(())
}

/// Parse a scope argument: a [`Phase`] name or `"all"`.
pub fn parse_scope(s: &str) -> Result<Option<Phase>> {
    if s == "all" {
        Ok(None)
    } else {
        s.parse().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::layer_in_phase;

    #[test]
    fn test_train_scope() {
        let mut layer = Layer::new("loss", "SoftmaxWithLoss");
        assign_phase(&mut layer, Some(Phase::Train)).unwrap();
        assert_eq!(layer.name, "train_loss");
        assert_eq!(layer.include, vec![PhaseRule::new(PhaseTag::Train)]);
        assert!(layer_in_phase(&layer, Phase::Train));
        assert!(!layer_in_phase(&layer, Phase::Val));
        assert!(!layer_in_phase(&layer, Phase::Deploy));
    }

    #[test]
    fn test_val_scope_on_data_layer() {
        let mut layer = Layer::new("train_data", "Data").with_exclude(PhaseTag::Test);
        assign_phase(&mut layer, Some(Phase::Val)).unwrap();
        assert_eq!(layer.name, "data");
        assert_eq!(layer.include, vec![PhaseRule::new(PhaseTag::Test)]);
        assert!(layer.exclude.is_empty());
    }

    #[test]
    fn test_trainval_scope() {
        let mut layer = Layer::new("accuracy", "Accuracy").with_include(PhaseTag::Test);
        assign_phase(&mut layer, Some(Phase::TrainVal)).unwrap();
        assert_eq!(layer.name, "train_accuracy");
        assert!(layer.include.is_empty());
        assert!(layer_in_phase(&layer, Phase::Train));
        assert!(layer_in_phase(&layer, Phase::Val));
        assert!(!layer_in_phase(&layer, Phase::Deploy));
    }

    #[test]
    fn test_deploy_scope() {
        let mut layer = Layer::new("train_prob", "Softmax");
        assign_phase(&mut layer, Some(Phase::Deploy)).unwrap();
        assert_eq!(layer.name, "deploy_prob");
        assert!(layer_in_phase(&layer, Phase::Deploy));
        assert!(!layer_in_phase(&layer, Phase::Train));
    }

    #[test]
    fn test_deploy_scope_rejects_data_layer() {
        let mut layer = Layer::new("data", "Data");
        let err = assign_phase(&mut layer, Some(Phase::Deploy)).unwrap_err();
        assert!(err.is_caller_error());
        assert_eq!(layer.name, "data");
    }

    #[test]
    fn test_all_scope_strips_prefix() {
        let mut layer = Layer::new("deploy_prob", "Softmax").with_include(PhaseTag::Test);
        assign_phase(&mut layer, None).unwrap();
        assert_eq!(layer.name, "prob");
        assert!(layer.include.is_empty());
    }

    #[test]
    fn test_reapply_is_idempotent() {
        for phase in [None, Some(Phase::Train), Some(Phase::Val), Some(Phase::TrainVal), Some(Phase::Deploy)] {
            let mut layer = Layer::new("conv1", "Convolution");
            assign_phase(&mut layer, phase).unwrap();
            let once = layer.clone();
            assign_phase(&mut layer, phase).unwrap();
            assert_eq!(layer, once, "phase {:?}", phase);
        }
    }

    #[test]
    fn test_parse_scope() {
        assert_eq!(parse_scope("all").unwrap(), None);
        assert_eq!(parse_scope("val").unwrap(), Some(Phase::Val));
        assert!(parse_scope("everything").unwrap_err().is_caller_error());
    }
}
