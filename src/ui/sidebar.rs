use crate::api::models::User;
use crate::contacts::ContactDirectory;
use gtk4 as gtk;
use gtk4::prelude::*;

const ROW_AVATAR: i32 = 40;

pub struct Sidebar {
    root: gtk::Box,
    list: gtk::ListBox,
    profile: gtk::Box,
}

impl Sidebar {
    pub fn new() -> Self {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);
        root.set_width_request(260);

        let title = gtk::Label::new(Some("Contacts"));
        title.add_css_class("heading");
        title.set_halign(gtk::Align::Start);
        root.append(&title);

        let scroller = gtk::ScrolledWindow::builder().vexpand(true).build();
        let list = gtk::ListBox::new();
        list.set_selection_mode(gtk::SelectionMode::Single);
        scroller.set_child(Some(&list));
        root.append(&scroller);

        let profile = gtk::Box::new(gtk::Orientation::Horizontal, 8);
        root.append(&profile);

        Self { root, list, profile }
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    pub fn connect_selected<F: Fn(usize) + 'static>(&self, f: F) {
        self.list.connect_row_activated(move |_, row| {
            if let Ok(idx) = usize::try_from(row.index()) {
                f(idx);
            }
        });
    }

    pub fn set_profile(&self, user: &User) {
        while let Some(child) = self.profile.first_child() {
            self.profile.remove(&child);
        }
        self.profile.append(&crate::ui::avatar_image(&user.avatar_image, ROW_AVATAR));
        let name = gtk::Label::new(Some(&user.username));
        name.add_css_class("heading");
        self.profile.append(&name);
    }

    /// Rebuilds the rows from the directory, keeping its highlighted row selected.
    pub fn set_items(&self, directory: &ContactDirectory) {
        while let Some(child) = self.list.first_child() {
            self.list.remove(&child);
        }
        for contact in directory.contacts() {
            let row = gtk::ListBoxRow::new();
            let content = gtk::Box::new(gtk::Orientation::Horizontal, 8);
            content.set_margin_top(6);
            content.set_margin_bottom(6);
            content.set_margin_start(6);
            content.set_margin_end(6);
            content.append(&crate::ui::avatar_image(&contact.avatar_image, ROW_AVATAR));

            let text = gtk::Box::new(gtk::Orientation::Vertical, 2);
            text.set_hexpand(true);
            let name = gtk::Label::new(Some(&contact.username));
            name.set_halign(gtk::Align::Start);
            text.append(&name);
            if let Some(preview) = directory.preview(&contact.id) {
                let preview = gtk::Label::new(Some(preview));
                preview.add_css_class("dim-label");
                preview.set_halign(gtk::Align::Start);
                preview.set_ellipsize(gtk4::pango::EllipsizeMode::End);
                text.append(&preview);
            }
            content.append(&text);

            let unread = directory.unread(&contact.id);
            if unread > 0 {
                let badge = gtk::Label::new(Some(&unread.to_string()));
                badge.add_css_class("accent");
                content.append(&badge);
            }
            row.set_child(Some(&content));
            self.list.append(&row);
        }
        if let Some(idx) = directory.selected_index() {
            let row = i32::try_from(idx).ok().and_then(|i| self.list.row_at_index(i));
            self.list.select_row(row.as_ref());
        }
    }
}
