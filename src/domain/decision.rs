//! Evaluator decisions and executor results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the evaluator decided for this cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerDecision {
    /// Metrics are within bounds; nothing to do.
    NoAction,
    /// Corrective action required.
    Act(ActionRequest),
}

impl TriggerDecision {
    /// Convenience constructor for the acting branch.
    pub fn act(subject: impl Into<String>, payload: Value) -> Self {
        Self::Act(ActionRequest::new(subject, payload))
    }

    /// True when this decision carries an action.
    pub fn is_act(&self) -> bool {
        matches!(self, Self::Act(_))
    }
}

/// The action a policy wants executed.
///
/// `subject` names the entity the action targets (a validator id, a node id,
/// a shard id, "firewall", ...). It keys the failure counter and appears in
/// the audit entry id, so it must be stable across cycles for the same entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Entity the action targets.
    pub subject: String,
    /// Policy-specific parameters, recorded in the audit details.
    pub payload: Value,
}

impl ActionRequest {
    pub fn new(subject: impl Into<String>, payload: Value) -> Self {
        Self {
            subject: subject.into(),
            payload,
        }
    }
}

/// What one execution attempt observed.
///
/// Engine call errors are returned as `Err` and are the retryable case;
/// `Rejected` is terminal for the cycle (the engine's validation said no).
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    /// The external operation succeeded; details feed the audit record.
    Executed(Value),
    /// The engine's validation rejected the proposed action.
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trigger_decision_act() {
        let decision = TriggerDecision::act("shard-3", json!({ "op": "split" }));
        assert!(decision.is_act());
        match decision {
            TriggerDecision::Act(req) => {
                assert_eq!(req.subject, "shard-3");
                assert_eq!(req.payload["op"], "split");
            }
            TriggerDecision::NoAction => panic!("expected Act"),
        }
    }

    #[test]
    fn test_trigger_decision_no_action() {
        assert!(!TriggerDecision::NoAction.is_act());
    }

    #[test]
    fn test_action_request_roundtrip() {
        let req = ActionRequest::new("node-9", json!({ "reboot": true }));
        let json = serde_json::to_string(&req).unwrap();
        let back: ActionRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req, back);
    }

    #[test]
    fn test_action_result_variants() {
        let ok = ActionResult::Executed(json!({ "new_key": "key-2" }));
        let no = ActionResult::Rejected("version incompatible".to_string());
        assert_ne!(ok, no);
    }
}
