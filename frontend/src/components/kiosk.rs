//! Line-oriented kiosk surface: turns typed lines into workflow commands and
//! renders view snapshots as text.

use chrono::Local;
use std::fmt::Write;

use super::check_in_workflow::{CheckInView, WorkflowCommand};
use crate::state::{FormField, Mode, NotificationKind, SearchStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KioskInput {
    Command(WorkflowCommand),
    /// 1-based position in the listed ministries
    PickMinistry(usize),
    Show,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  first <name>        set first name
  last <name>         set last name
  email <address>     set email
  phone <number>      set phone
  ministry [<n>]      choose a listed ministry (blank clears)
  submit              check in
  reset               clear the form
  page <n> | next | prev
  refresh             reload today's roster
  dismiss             hide the current message
  show | help | quit";

/// Parse one input line. Unknown input yields an error message for the user.
pub fn parse_command(line: &str) -> Result<KioskInput, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_lowercase().as_str() {
        "first" => WorkflowCommand::SetFirstName(rest.to_string()),
        "last" => WorkflowCommand::SetLastName(rest.to_string()),
        "email" => WorkflowCommand::SetEmail(rest.to_string()),
        "phone" => WorkflowCommand::SetPhone(rest.to_string()),
        "ministry" => match rest.parse::<usize>() {
            Ok(index) => return Ok(KioskInput::PickMinistry(index)),
            Err(_) => WorkflowCommand::SelectMinistry((!rest.is_empty()).then(|| rest.to_string())),
        },
        "submit" => WorkflowCommand::Submit,
        "reset" => WorkflowCommand::Reset,
        "next" => WorkflowCommand::NextPage,
        "prev" | "previous" => WorkflowCommand::PreviousPage,
        "page" => {
            let page = rest
                .parse::<usize>()
                .map_err(|_| format!("Invalid page number: {:?}", rest))?;
            WorkflowCommand::GoToPage(page)
        }
        "refresh" => WorkflowCommand::RefreshRoster,
        "dismiss" => WorkflowCommand::DismissNotification,
        "show" | "" => return Ok(KioskInput::Show),
        "help" | "?" => return Ok(KioskInput::Help),
        "quit" | "exit" => return Ok(KioskInput::Quit),
        other => return Err(format!("Unknown command: {} (type 'help')", other)),
    };

    Ok(KioskInput::Command(command))
}

/// Turn a listed ministry number into a selection command
pub fn ministry_command(view: &CheckInView, index: usize) -> Result<WorkflowCommand, String> {
    index
        .checked_sub(1)
        .and_then(|i| view.ministries.get(i))
        .map(|ministry| WorkflowCommand::SelectMinistry(Some(ministry.id.clone())))
        .ok_or_else(|| match view.ministries.len() {
            0 => "No ministries to choose from".to_string(),
            count => format!("Choose a ministry between 1 and {}", count),
        })
}

/// Render a snapshot as a text screen
pub fn render_view(view: &CheckInView) -> String {
    let mut out = String::new();

    if let Some(notification) = &view.notification {
        let icon = match notification.kind {
            NotificationKind::Success => "✅",
            NotificationKind::Error => "❌",
            NotificationKind::Warning => "⚠️",
        };
        let _ = writeln!(out, "{} {}", icon, notification.message);
    }

    let mode = match &view.mode {
        Mode::Search(SearchStatus::Idle) => "Search".to_string(),
        Mode::Search(SearchStatus::Pending { .. }) => "Search (looking up...)".to_string(),
        Mode::Search(SearchStatus::AlreadyCheckedIn(person)) => {
            format!("Search ({} already checked in)", person.full_name())
        }
        Mode::QuickCheckIn(person) => format!("Quick check-in for {}", person.full_name()),
        Mode::NewMember => "New member registration".to_string(),
    };
    let _ = writeln!(out, "Mode: {}", mode);

    let form = &view.form;
    let fields = [
        ("First name", &form.first_name, Some(FormField::FirstName)),
        ("Last name", &form.last_name, Some(FormField::LastName)),
        ("Email", &form.email, Some(FormField::Email)),
        ("Phone", &form.phone, None),
    ];
    for (label, value, field) in fields {
        let _ = writeln!(out, "  {:<11} {}", format!("{}:", label), value);
        for error in view.field_errors.iter().filter(|e| Some(e.field()) == field) {
            let _ = writeln!(out, "    ! {}", error);
        }
    }

    if !view.ministries.is_empty() {
        let _ = writeln!(out, "  Ministries:");
        for (i, ministry) in view.ministries.iter().enumerate() {
            let marker = if form.ministry_id.as_deref() == Some(ministry.id.as_str()) { "*" } else { " " };
            let _ = writeln!(out, "   {}[{}] {}", marker, i + 1, ministry.name);
        }
    }

    let action = if view.is_submitting {
        "[checking in...]"
    } else if view.can_submit {
        "[submit ready]"
    } else {
        "[submit disabled]"
    };
    let _ = writeln!(out, "{}", action);

    let _ = writeln!(
        out,
        "Today's check-ins: {} (page {}/{})",
        view.roster_total, view.roster_page, view.roster_page_count
    );
    for row in &view.roster_rows {
        let time = row.check_in_time.with_timezone(&Local).format("%H:%M");
        let badge = if row.is_first_time_visitor { " (first visit)" } else { "" };
        let _ = writeln!(out, "  {}  {}{}", time, row.name, badge);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{CheckInForm, FormFieldError, Notification, RosterRow};
    use chrono::Utc;
    use shared::{Ministry, PersonRef};

    fn ministries() -> Vec<Ministry> {
        ["Choir", "Ushers"]
            .iter()
            .enumerate()
            .map(|(i, name)| Ministry {
                id: format!("ministry::{}", i),
                name: name.to_string(),
                description: None,
            })
            .collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_command("first  Jane  "),
            Ok(KioskInput::Command(WorkflowCommand::SetFirstName("Jane".to_string())))
        );
        assert_eq!(
            parse_command("LAST van der Berg"),
            Ok(KioskInput::Command(WorkflowCommand::SetLastName("van der Berg".to_string())))
        );
        assert_eq!(
            parse_command("ministry"),
            Ok(KioskInput::Command(WorkflowCommand::SelectMinistry(None)))
        );
        assert_eq!(parse_command("ministry 2"), Ok(KioskInput::PickMinistry(2)));
        assert_eq!(parse_command("page 2"), Ok(KioskInput::Command(WorkflowCommand::GoToPage(2))));
        assert_eq!(parse_command("quit"), Ok(KioskInput::Quit));
        assert_eq!(parse_command(""), Ok(KioskInput::Show));
        assert_eq!(
            parse_command("first"),
            Ok(KioskInput::Command(WorkflowCommand::SetFirstName(String::new())))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("page two").is_err());
        assert!(parse_command("dance").unwrap_err().contains("Unknown command"));
    }

    #[test]
    fn test_render_quick_check_in_with_roster() {
        let jane = PersonRef {
            id: "person::jane".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: None,
            phone: None,
        };
        let view = CheckInView {
            mode: Mode::QuickCheckIn(jane),
            can_submit: true,
            notification: Some(Notification {
                id: 1,
                kind: NotificationKind::Success,
                message: "Welcome back, Jane Doe! Ready for quick check-in.".to_string(),
            }),
            roster_rows: vec![RosterRow {
                record_id: "attendance::1".to_string(),
                name: "Unknown".to_string(),
                check_in_time: Utc::now(),
                is_first_time_visitor: true,
            }],
            roster_page: 1,
            roster_page_count: 1,
            roster_total: 1,
            ..Default::default()
        };

        let screen = render_view(&view);
        assert!(screen.starts_with("✅ Welcome back, Jane Doe!"));
        assert!(screen.contains("Mode: Quick check-in for Jane Doe"));
        assert!(screen.contains("[submit ready]"));
        assert!(screen.contains("Today's check-ins: 1 (page 1/1)"));
        assert!(screen.contains("Unknown (first visit)"));
    }

    #[test]
    fn test_ministries_are_listed_and_picked_by_number() {
        let view = CheckInView {
            form: CheckInForm {
                ministry_id: Some("ministry::1".to_string()),
                ..Default::default()
            },
            ministries: ministries(),
            ..Default::default()
        };

        let screen = render_view(&view);
        assert!(screen.contains("   [1] Choir"));
        assert!(screen.contains("  *[2] Ushers"));

        assert_eq!(
            ministry_command(&view, 1),
            Ok(WorkflowCommand::SelectMinistry(Some("ministry::0".to_string())))
        );
        assert!(ministry_command(&view, 0).is_err());
        assert_eq!(ministry_command(&view, 3), Err("Choose a ministry between 1 and 2".to_string()));
        assert!(ministry_command(&CheckInView::default(), 1).is_err());
    }

    #[test]
    fn test_field_errors_render_under_their_field() {
        let view = CheckInView {
            mode: Mode::NewMember,
            field_errors: vec![FormFieldError::EmailRequired, FormFieldError::FirstNameTooShort(2)],
            ..Default::default()
        };

        let screen = render_view(&view);
        let lines: Vec<&str> = screen.lines().collect();
        let first = lines.iter().position(|l| l.trim_start().starts_with("First name:")).unwrap();
        let email = lines.iter().position(|l| l.trim_start().starts_with("Email:")).unwrap();

        assert_eq!(lines[first + 1].trim(), "! First name must be at least 2 characters");
        assert_eq!(lines[email + 1].trim(), "! Email is required for new members");
    }
}
