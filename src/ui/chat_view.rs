use crate::api::models::Contact;
use crate::chat::{ChatMessage, Delivery, insert_at_cursor};
use gtk4 as gtk;
use gtk4::prelude::*;
use std::rc::Rc;

const HEADER_AVATAR: i32 = 36;

pub struct ChatView {
    root: gtk::Box,
    header: gtk::Box,
    scroller: gtk::ScrolledWindow,
    messages_box: gtk::Box,
    entry: gtk::Entry,
    send_btn: gtk::Button,
}

impl ChatView {
    pub fn new() -> Rc<Self> {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);

        let header = gtk::Box::new(gtk::Orientation::Horizontal, 8);
        root.append(&header);

        let scroller = gtk::ScrolledWindow::builder()
            .vexpand(true)
            .hexpand(true)
            .build();
        let messages_box = gtk::Box::new(gtk::Orientation::Vertical, 6);
        scroller.set_child(Some(&messages_box));
        root.append(&scroller);

        let input_row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        let entry = gtk::Entry::new();
        entry.set_hexpand(true);
        entry.set_placeholder_text(Some("Type your message here…"));

        let emoji_chooser = gtk::EmojiChooser::new();
        let emoji_btn = gtk::MenuButton::builder()
            .icon_name("face-smile-symbolic")
            .tooltip_text("Insert emoji")
            .popover(&emoji_chooser)
            .build();
        {
            let entry = entry.clone();
            emoji_chooser.connect_emoji_picked(move |_, emoji| {
                let cursor = usize::try_from(entry.position()).unwrap_or(0);
                let (draft, cursor) = insert_at_cursor(&entry.text(), cursor, emoji);
                entry.set_text(&draft);
                entry.set_position(i32::try_from(cursor).unwrap_or(-1));
                entry.grab_focus_without_selecting();
            });
        }

        let send_btn = gtk::Button::with_label("Send");
        send_btn.add_css_class("suggested-action");
        input_row.append(&emoji_btn);
        input_row.append(&entry);
        input_row.append(&send_btn);
        root.append(&input_row);

        Rc::new(Self { root, header, scroller, messages_box, entry, send_btn })
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    pub fn set_contact(&self, contact: &Contact) {
        while let Some(child) = self.header.first_child() {
            self.header.remove(&child);
        }
        self.header.append(&crate::ui::avatar_image(&contact.avatar_image, HEADER_AVATAR));
        let name = gtk::Label::new(Some(&contact.username));
        name.add_css_class("title-4");
        self.header.append(&name);
    }

    /// `f` receives the entry text; the entry is cleared only for non-blank input.
    pub fn connect_send<F: Fn(String) + 'static>(&self, f: F) {
        let f = Rc::new(f);
        let entry = self.entry.clone();
        let send: Rc<dyn Fn()> = Rc::new(move || {
            let text = entry.text().to_string();
            if text.trim().is_empty() {
                return;
            }
            entry.set_text("");
            (f)(text);
        });
        {
            let send = send.clone();
            self.send_btn.connect_clicked(move |_| (send)());
        }
        {
            let send = send.clone();
            self.entry.connect_activate(move |_| (send)());
        }
    }

    pub fn render(&self, messages: &[ChatMessage], scroll_to_latest: bool) {
        while let Some(child) = self.messages_box.first_child() {
            self.messages_box.remove(&child);
        }
        for message in messages {
            let bubble = gtk::Box::new(gtk::Orientation::Vertical, 2);
            bubble.add_css_class("card");
            let text = gtk::Label::new(Some(&message.text));
            text.set_wrap(true);
            text.set_xalign(0.0);
            text.set_margin_top(6);
            text.set_margin_start(8);
            text.set_margin_end(8);
            bubble.append(&text);

            let meta = match (message.is_own(), message.delivery) {
                (true, Delivery::Pending) => format!("{} …", message.display_time()),
                (true, Delivery::Delivered) => format!("{} ✓", message.display_time()),
                (true, Delivery::Failed) => format!("{} ! not saved", message.display_time()),
                (false, _) => message.display_time(),
            };
            let time = gtk::Label::new(Some(&meta));
            time.add_css_class("dim-label");
            time.add_css_class("caption");
            time.set_halign(gtk::Align::End);
            time.set_margin_bottom(4);
            time.set_margin_end(8);
            bubble.append(&time);

            bubble.set_halign(if message.is_own() { gtk::Align::End } else { gtk::Align::Start });
            self.messages_box.append(&bubble);
        }
        if scroll_to_latest {
            let scroller = self.scroller.clone();
            // upper is only updated after the next layout pass
            glib::idle_add_local_once(move || {
                let adj = scroller.vadjustment();
                adj.set_value(adj.upper());
            });
        }
    }
}
