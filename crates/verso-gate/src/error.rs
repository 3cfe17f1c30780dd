use verso_types::Capability;

use crate::operation::Operation;

/// Errors produced by the access gate.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// The caller holds none of the capabilities the operation accepts.
    #[error("{operation} denied: requires {}", required_list(.required))]
    Denied {
        operation: Operation,
        required: Vec<Capability>,
    },
}

fn required_list(required: &[Capability]) -> String {
    required
        .iter()
        .map(Capability::as_str)
        .collect::<Vec<_>>()
        .join(" or ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denied_message_names_flags() {
        let err = GateError::Denied {
            operation: Operation::History,
            required: Operation::History.accepted_capabilities().to_vec(),
        };
        assert_eq!(
            err.to_string(),
            "history denied: requires site_history or site_history_preview"
        );
    }
}
