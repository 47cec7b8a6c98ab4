//! Multi-step input dialogs (registration, ticket creation).
//!
//! Each in-flight dialog is an explicit keyed record in [`FlowSessions`],
//! overwritten when the user starts a new flow and removed on any terminal
//! transition. The state machines themselves are pure: `advance` consumes
//! the current state plus one line of input and reports what happened, so
//! handlers only render messages and apply effects.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::{
    domain::{User, UserId, ADMIN_PRIORITY},
    ports::Storage,
    Result,
};

/// An in-flight dialog for one user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    Register(RegisterFlow),
    NewTicket(TicketDraft),
}

/// Per-user dialog store. One active flow per user; starting a new flow
/// overwrites the old one.
#[derive(Default)]
pub struct FlowSessions {
    inner: Mutex<HashMap<UserId, Flow>>,
}

impl FlowSessions {
    pub async fn begin(&self, uid: UserId, flow: Flow) {
        self.inner.lock().await.insert(uid, flow);
    }

    /// Remove and return the user's active flow, if any. Callers put the
    /// flow back via [`FlowSessions::put`] when it has not terminated.
    pub async fn take(&self, uid: UserId) -> Option<Flow> {
        self.inner.lock().await.remove(&uid)
    }

    pub async fn put(&self, uid: UserId, flow: Flow) {
        self.inner.lock().await.insert(uid, flow);
    }

    pub async fn is_active(&self, uid: UserId) -> bool {
        self.inner.lock().await.contains_key(&uid)
    }
}

/// Collected registration fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub department: String,
}

/// Registration dialog states.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegisterFlow {
    CollectingName,
    CollectingDepartment {
        first_name: String,
        last_name: String,
    },
    AwaitingConfirmation(Registration),
}

/// What a registration input did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegisterAdvance {
    /// Fewer than two name tokens; state unchanged.
    InvalidName,
    /// Empty department; state unchanged.
    InvalidDepartment,
    /// Name accepted, now collecting the department.
    NeedDepartment,
    /// All fields collected; waiting for `/confirm` or `/reject`.
    NeedConfirmation(Registration),
    /// Neither `/confirm` nor `/reject`; state unchanged.
    InvalidConfirmation,
    /// Terminal: user confirmed.
    Confirmed(Registration),
    /// Terminal: user rejected.
    Rejected,
}

impl RegisterFlow {
    /// Entry point: skip name collection when the platform already knows
    /// the user's first and last name.
    pub fn begin(profile_name: Option<(String, String)>) -> Self {
        match profile_name {
            Some((first_name, last_name)) => RegisterFlow::CollectingDepartment {
                first_name,
                last_name,
            },
            None => RegisterFlow::CollectingName,
        }
    }

    /// Feed one message of user input. Returns the next state (`None` on
    /// terminal transitions) and the outcome to report.
    pub fn advance(self, input: &str) -> (Option<RegisterFlow>, RegisterAdvance) {
        match self {
            RegisterFlow::CollectingName => {
                let mut tokens = input.split_whitespace();
                match (tokens.next(), tokens.next()) {
                    (Some(first), Some(last)) => (
                        Some(RegisterFlow::CollectingDepartment {
                            first_name: first.to_string(),
                            last_name: last.to_string(),
                        }),
                        RegisterAdvance::NeedDepartment,
                    ),
                    _ => (
                        Some(RegisterFlow::CollectingName),
                        RegisterAdvance::InvalidName,
                    ),
                }
            }
            RegisterFlow::CollectingDepartment {
                first_name,
                last_name,
            } => {
                let department = input.trim();
                if department.is_empty() {
                    return (
                        Some(RegisterFlow::CollectingDepartment {
                            first_name,
                            last_name,
                        }),
                        RegisterAdvance::InvalidDepartment,
                    );
                }
                let registration = Registration {
                    first_name,
                    last_name,
                    department: department.to_string(),
                };
                (
                    Some(RegisterFlow::AwaitingConfirmation(registration.clone())),
                    RegisterAdvance::NeedConfirmation(registration),
                )
            }
            RegisterFlow::AwaitingConfirmation(registration) => match input.trim() {
                "/confirm" => (None, RegisterAdvance::Confirmed(registration)),
                "/reject" => (None, RegisterAdvance::Rejected),
                _ => (
                    Some(RegisterFlow::AwaitingConfirmation(registration)),
                    RegisterAdvance::InvalidConfirmation,
                ),
            },
        }
    }
}

/// Outcome of committing a confirmed registration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegisterOutcome {
    Created(User),
    AlreadyRegistered,
}

/// Persist a confirmed registration. The administrator registers with
/// department "Admin" and elevated priority regardless of collected fields;
/// a second registration for the same identity is a no-op.
pub fn commit_registration(
    store: &dyn Storage,
    uid: UserId,
    registration: Registration,
    is_admin: bool,
) -> Result<RegisterOutcome> {
    if store.user_by_uid(uid)?.is_some() {
        return Ok(RegisterOutcome::AlreadyRegistered);
    }

    let user = if is_admin {
        User {
            user_uid: uid,
            first_name: registration.first_name,
            last_name: registration.last_name,
            department: "Admin".to_string(),
            priority: ADMIN_PRIORITY,
        }
    } else {
        User {
            user_uid: uid,
            first_name: registration.first_name,
            last_name: registration.last_name,
            department: registration.department,
            priority: 0,
        }
    };

    store.add_user(&user)?;
    Ok(RegisterOutcome::Created(user))
}

/// Ticket creation dialog states.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TicketDraft {
    CollectingTitle,
    CollectingDescription { title: String },
}

/// What a ticket-draft input did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TicketAdvance {
    /// Title accepted, now collecting the description.
    NeedDescription,
    /// Terminal: both fields collected, ready to persist.
    Submit { title: String, description: String },
}

impl TicketDraft {
    pub fn begin() -> Self {
        TicketDraft::CollectingTitle
    }

    /// Feed one message of user input. Both steps accept arbitrary text.
    pub fn advance(self, input: &str) -> (Option<TicketDraft>, TicketAdvance) {
        match self {
            TicketDraft::CollectingTitle => (
                Some(TicketDraft::CollectingDescription {
                    title: input.to_string(),
                }),
                TicketAdvance::NeedDescription,
            ),
            TicketDraft::CollectingDescription { title } => (
                None,
                TicketAdvance::Submit {
                    title,
                    description: input.to_string(),
                },
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MemStore;

    fn reg() -> Registration {
        Registration {
            first_name: "Ivan".to_string(),
            last_name: "Petrov".to_string(),
            department: "Dev".to_string(),
        }
    }

    #[test]
    fn name_needs_two_tokens() {
        let (state, outcome) = RegisterFlow::CollectingName.advance("Ivan");
        assert_eq!(state, Some(RegisterFlow::CollectingName));
        assert_eq!(outcome, RegisterAdvance::InvalidName);

        let (state, outcome) = RegisterFlow::CollectingName.advance("  Ivan   Petrov  ");
        assert_eq!(
            state,
            Some(RegisterFlow::CollectingDepartment {
                first_name: "Ivan".to_string(),
                last_name: "Petrov".to_string(),
            })
        );
        assert_eq!(outcome, RegisterAdvance::NeedDepartment);
    }

    #[test]
    fn profile_name_skips_name_collection() {
        let flow = RegisterFlow::begin(Some(("Ivan".to_string(), "Petrov".to_string())));
        assert!(matches!(flow, RegisterFlow::CollectingDepartment { .. }));

        assert_eq!(RegisterFlow::begin(None), RegisterFlow::CollectingName);
    }

    #[test]
    fn department_must_be_non_empty() {
        let flow = RegisterFlow::begin(Some(("Ivan".to_string(), "Petrov".to_string())));
        let (state, outcome) = flow.clone().advance("   ");
        assert_eq!(state, Some(flow));
        assert_eq!(outcome, RegisterAdvance::InvalidDepartment);
    }

    #[test]
    fn confirmation_accepts_only_confirm_or_reject() {
        let flow = RegisterFlow::AwaitingConfirmation(reg());

        let (state, outcome) = flow.clone().advance("yes please");
        assert_eq!(state, Some(flow.clone()));
        assert_eq!(outcome, RegisterAdvance::InvalidConfirmation);

        let (state, outcome) = flow.clone().advance("/confirm");
        assert_eq!(state, None);
        assert_eq!(outcome, RegisterAdvance::Confirmed(reg()));

        let (state, outcome) = flow.advance("/reject");
        assert_eq!(state, None);
        assert_eq!(outcome, RegisterAdvance::Rejected);
    }

    #[test]
    fn commit_creates_user_once() {
        let store = MemStore::default();
        let uid = UserId(1);

        let outcome = commit_registration(&store, uid, reg(), false).unwrap();
        let RegisterOutcome::Created(user) = outcome else {
            panic!("expected creation");
        };
        assert_eq!(user.first_name, "Ivan");
        assert_eq!(user.last_name, "Petrov");
        assert_eq!(user.department, "Dev");
        assert_eq!(user.priority, 0);

        // Registering the same identity twice never creates a second row.
        assert_eq!(
            commit_registration(&store, uid, reg(), false).unwrap(),
            RegisterOutcome::AlreadyRegistered
        );
        assert!(store.user_by_uid(uid).unwrap().is_some());
    }

    #[test]
    fn admin_commit_forces_department_and_priority() {
        let store = MemStore::default();
        let outcome = commit_registration(&store, UserId(99), reg(), true).unwrap();
        let RegisterOutcome::Created(user) = outcome else {
            panic!("expected creation");
        };
        assert_eq!(user.department, "Admin");
        assert_eq!(user.priority, ADMIN_PRIORITY);
    }

    #[test]
    fn ticket_draft_collects_title_then_description() {
        let (state, outcome) = TicketDraft::begin().advance("Laptop broken");
        assert_eq!(outcome, TicketAdvance::NeedDescription);

        let (state, outcome) = state.unwrap().advance("Screen stays black on boot.");
        assert_eq!(state, None);
        assert_eq!(
            outcome,
            TicketAdvance::Submit {
                title: "Laptop broken".to_string(),
                description: "Screen stays black on boot.".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn sessions_overwrite_and_terminate() {
        let sessions = FlowSessions::default();
        let uid = UserId(5);

        sessions.begin(uid, Flow::Register(RegisterFlow::CollectingName)).await;
        assert!(sessions.is_active(uid).await);

        // Starting a new flow overwrites the old one.
        sessions.begin(uid, Flow::NewTicket(TicketDraft::begin())).await;
        assert_eq!(
            sessions.take(uid).await,
            Some(Flow::NewTicket(TicketDraft::CollectingTitle))
        );

        // take removes the entry.
        assert!(!sessions.is_active(uid).await);
    }
}
