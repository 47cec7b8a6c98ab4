//! User-facing message rendering (Telegram HTML parse mode).

use crate::domain::{BlockedUser, Ticket, User};

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// One ticket as a summary block: requester, department, priority, title,
/// description, status.
pub fn ticket_summary(owner: &User, ticket: &Ticket) -> String {
    format!(
        "From: {} {}\nDepartment: {}\nPriority: {}\nTitle: {}\nDescription: {}\nStatus: {}",
        escape_html(&owner.first_name),
        escape_html(&owner.last_name),
        escape_html(&owner.department),
        owner.priority,
        escape_html(&ticket.title),
        escape_html(&ticket.description),
        ticket.status,
    )
}

/// Summary block prefixed with the ticket number, as sent to the
/// administrator on creation.
pub fn new_ticket_notification(owner: &User, ticket: &Ticket) -> String {
    format!(
        "New ticket #{}:\n{}",
        ticket.id,
        ticket_summary(owner, ticket)
    )
}

/// Summary block prefixed with the ticket number, as shown in listings.
pub fn ticket_listing(owner: &User, ticket: &Ticket) -> String {
    format!("Ticket #{}:\n{}", ticket.id, ticket_summary(owner, ticket))
}

/// The caller's non-terminal tickets as `id: title (status)` lines, or a
/// placeholder when there are none.
pub fn active_tickets(tickets: &[Ticket]) -> String {
    let lines: Vec<String> = tickets
        .iter()
        .filter(|t| !t.status.is_terminal())
        .map(|t| {
            format!(
                "{}: {} ({})",
                t.id,
                escape_html(&t.title),
                t.status
            )
        })
        .collect();

    if lines.is_empty() {
        return "You have no active tickets.".to_string();
    }
    format!("Your active tickets:\n{}", lines.join("\n"))
}

pub fn blocked_user_line(user: &BlockedUser) -> String {
    format!("{}: {}", user.user_uid.0, escape_html(&user.reason))
}

pub fn help_text() -> &'static str {
    "Available commands:\n\
     /register - register with the bot (name and department)\n\
     /new_ticket - open a new support ticket\n\
     /tickets - list your tickets\n\
     /cancel <id> - cancel one of your tickets\n\
     /complete <id> - close one of your tickets yourself\n\
     /help - this reference"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TicketId, TicketStatus, UserId};
    use chrono::Utc;

    fn user() -> User {
        User {
            user_uid: UserId(1),
            first_name: "Ivan".to_string(),
            last_name: "Petrov".to_string(),
            department: "Dev".to_string(),
            priority: 0,
        }
    }

    fn ticket(id: i64, status: TicketStatus) -> Ticket {
        let now = Utc::now();
        Ticket {
            id: TicketId(id),
            user_uid: UserId(1),
            title: "Laptop <broken>".to_string(),
            description: "It & me".to_string(),
            status,
            update_reason: None,
            created_at: now,
            last_updated: now,
        }
    }

    #[test]
    fn escapes_html_special_characters() {
        assert_eq!(
            escape_html(r#"<b>"a" & b</b>"#),
            "&lt;b&gt;&quot;a&quot; &amp; b&lt;/b&gt;"
        );
    }

    #[test]
    fn summary_escapes_and_lists_all_fields() {
        let text = ticket_summary(&user(), &ticket(7, TicketStatus::New));
        assert!(text.contains("Ivan Petrov"));
        assert!(text.contains("Department: Dev"));
        assert!(text.contains("Priority: 0"));
        assert!(text.contains("Laptop &lt;broken&gt;"));
        assert!(text.contains("It &amp; me"));
        assert!(text.contains("Status: new"));
    }

    #[test]
    fn active_tickets_hides_terminal_ones() {
        let tickets = vec![
            ticket(1, TicketStatus::New),
            ticket(2, TicketStatus::Completed),
            ticket(3, TicketStatus::InWork),
        ];
        let text = active_tickets(&tickets);
        assert!(text.contains("1:"));
        assert!(!text.contains("2:"));
        assert!(text.contains("3:"));

        assert_eq!(
            active_tickets(&[ticket(2, TicketStatus::Rejected)]),
            "You have no active tickets."
        );
    }
}
