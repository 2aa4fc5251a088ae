use std::fmt::{Display, Formatter, Result as FmtResult};

use super::{PlayerCard, RequestAction};

pub const NO_CONNECTIONS: &str = "You have no connections yet.";
pub const NO_PENDING_REQUESTS: &str = "No pending connection requests.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Player ID, unique within a section
    pub key: String,
    pub label: String,
    pub username: String,
    pub avatar: Option<String>,
    pub actions: Vec<RequestAction>,
}

impl Row {
    fn from_card(card: &PlayerCard, actions: &[RequestAction]) -> Self {
        Self {
            key: card.id.clone(),
            label: card.label().to_owned(),
            username: card.username.clone(),
            avatar: card.avatar.clone(),
            actions: actions.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: &'static str,
    pub placeholder: &'static str,
    pub rows: Vec<Row>,
}

impl Section {
    fn new(
        title: &'static str,
        placeholder: &'static str,
        cards: &[PlayerCard],
        actions: &[RequestAction],
    ) -> Self {
        Self {
            title,
            placeholder,
            rows: cards.iter().map(|c| Row::from_card(c, actions)).collect(),
        }
    }
}

impl Display for Section {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        writeln!(f, "{}", self.title)?;
        if self.rows.is_empty() {
            return writeln!(f, "  {}", self.placeholder);
        }

        for row in &self.rows {
            write!(f, "  - {}", row.label)?;
            if row.label != row.username {
                write!(f, " (@{})", row.username)?;
            }
            write!(f, "  [{}]", row.key)?;
            if let Some(avatar) = &row.avatar {
                write!(f, "  avatar: {avatar}")?;
            }
            writeln!(f)?;

            if !row.actions.is_empty() {
                let actions: Vec<&str> = row.actions.iter().map(|a| a.as_str()).collect();
                writeln!(f, "      actions: {}", actions.join(" | "))?;
            }
        }
        Ok(())
    }
}

/// Everything the connections page shows, ready to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    pub connections: Section,
    pub pending_requests: Section,
}

impl PageView {
    #[must_use]
    pub fn new(connections: &[PlayerCard], pending_requests: &[PlayerCard]) -> Self {
        Self {
            connections: Section::new("Connections", NO_CONNECTIONS, connections, &[]),
            pending_requests: Section::new(
                "Pending Requests",
                NO_PENDING_REQUESTS,
                pending_requests,
                &[RequestAction::Accept, RequestAction::Reject],
            ),
        }
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.connections.rows.len() + self.pending_requests.rows.len()
    }
}

impl Display for PageView {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.connections)?;
        writeln!(f)?;
        write!(f, "{}", self.pending_requests)
    }
}
