use crate::api::models::Contact;
use std::collections::HashMap;

/// Contact list as handed out by the backend, plus the highlighted row.
///
/// Previews and unread counts only reflect what this client saw during the
/// current login; nothing is fetched for them.
#[derive(Debug, Clone, Default)]
pub struct ContactDirectory {
    contacts: Vec<Contact>,
    selected: Option<usize>,
    previews: HashMap<String, String>,
    unread: HashMap<String, u32>,
}

impl ContactDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_contacts(&mut self, contacts: Vec<Contact>) {
        self.contacts = contacts;
        self.selected = None;
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Highlights `index` and returns that contact. Out of range leaves the
    /// highlight where it was.
    pub fn select(&mut self, index: usize) -> Option<&Contact> {
        let contact = self.contacts.get(index)?;
        self.selected = Some(index);
        self.unread.remove(&contact.id);
        Some(contact)
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected(&self) -> Option<&Contact> {
        self.selected.and_then(|idx| self.contacts.get(idx))
    }

    pub fn note_message(&mut self, contact_id: &str, text: &str) {
        self.previews.insert(contact_id.to_string(), text.to_string());
    }

    pub fn preview(&self, contact_id: &str) -> Option<&str> {
        self.previews.get(contact_id).map(String::as_str)
    }

    pub fn note_unread(&mut self, contact_id: &str) {
        *self.unread.entry(contact_id.to_string()).or_default() += 1;
    }

    pub fn unread(&self, contact_id: &str) -> u32 {
        self.unread.get(contact_id).copied().unwrap_or(0)
    }
}
