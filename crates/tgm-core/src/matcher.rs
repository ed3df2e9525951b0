//! Target matching: which registered targets should see an inbound message.

use crate::domain::{ChatId, Target, UserId};

/// Who actually authored a message, after unwrapping any forward envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Originator {
    DirectSender(UserId),
    ForwardedFrom(UserId),
    Unknown,
}

impl Originator {
    /// Resolve the true originator once per inbound event.
    ///
    /// `forward` is `None` for a non-forwarded message, `Some(None)` for a forward
    /// whose original author is hidden, `Some(Some(id))` otherwise. A forward
    /// never falls back to the immediate sender.
    pub fn resolve(sender: Option<UserId>, forward: Option<Option<UserId>>) -> Self {
        match forward {
            Some(Some(id)) => Originator::ForwardedFrom(id),
            Some(None) => Originator::Unknown,
            None => sender.map_or(Originator::Unknown, Originator::DirectSender),
        }
    }

    pub fn account_id(self) -> Option<UserId> {
        match self {
            Originator::DirectSender(id) | Originator::ForwardedFrom(id) => Some(id),
            Originator::Unknown => None,
        }
    }
}

/// All active targets watching `originator` in `group`. Every match is returned;
/// several watchers may follow the same account in the same group.
pub fn match_targets<'a>(
    group: ChatId,
    originator: Originator,
    targets: &'a [Target],
) -> Vec<&'a Target> {
    let Some(account) = originator.account_id() else {
        return Vec::new();
    };

    targets
        .iter()
        .filter(|t| t.active && t.account_id == account && t.group_id == group)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FilterRule, TargetId};
    use chrono::Utc;

    fn target(id: i64, watcher: i64, account: i64, group: i64, active: bool) -> Target {
        Target {
            id: TargetId(id),
            watcher_id: UserId(watcher),
            account_id: UserId(account),
            account_handle: format!("acc{account}"),
            group_id: ChatId(group),
            group_name: format!("group{group}"),
            active,
            created_at: Utc::now(),
            filter: FilterRule::default(),
        }
    }

    #[test]
    fn forward_envelope_wins_over_sender() {
        assert_eq!(
            Originator::resolve(Some(UserId(1)), Some(Some(UserId(2)))),
            Originator::ForwardedFrom(UserId(2))
        );
        assert_eq!(
            Originator::resolve(Some(UserId(1)), None),
            Originator::DirectSender(UserId(1))
        );
    }

    #[test]
    fn hidden_forward_or_missing_sender_is_unknown() {
        assert_eq!(
            Originator::resolve(Some(UserId(1)), Some(None)),
            Originator::Unknown
        );
        assert_eq!(Originator::resolve(None, None), Originator::Unknown);
    }

    #[test]
    fn matches_account_and_group() {
        let targets = vec![
            target(1, 100, 5, -1, true),
            target(2, 100, 5, -2, true),
            target(3, 100, 6, -1, true),
        ];
        let got = match_targets(ChatId(-1), Originator::DirectSender(UserId(5)), &targets);
        assert_eq!(got.iter().map(|t| t.id).collect::<Vec<_>>(), vec![TargetId(1)]);
    }

    #[test]
    fn fans_out_to_every_watcher() {
        let targets = vec![target(1, 100, 5, -1, true), target(2, 200, 5, -1, true)];
        let got = match_targets(ChatId(-1), Originator::ForwardedFrom(UserId(5)), &targets);
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn never_returns_inactive_targets() {
        let targets = vec![target(1, 100, 5, -1, false), target(2, 200, 5, -1, true)];
        let got = match_targets(ChatId(-1), Originator::DirectSender(UserId(5)), &targets);
        assert!(got.iter().all(|t| t.active));
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn unknown_originator_matches_nothing() {
        let targets = vec![target(1, 100, 5, -1, true)];
        assert!(match_targets(ChatId(-1), Originator::Unknown, &targets).is_empty());
    }
}
