//! Avatar candidates and the commit of a chosen one.
//!
//! Candidates are symmetric 5x5 identicons rendered to SVG and base64 encoded,
//! the same encoding the backend stores and hands out for every user.

use crate::api::ChatBackend;
use crate::api::models::User;
use crate::error::{Error, Result};
use crate::session::SessionStore;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

pub const CANDIDATE_COUNT: usize = 4;
const SEED_LEN: usize = 8;
const GRID: usize = 5;

/// Eight random base-36 characters.
pub fn random_seed() -> String {
    let mut rng = rand::thread_rng();
    (0..SEED_LEN)
        .filter_map(|_| std::char::from_digit(rng.gen_range(0..36), 36))
        .collect()
}

/// Renders the identicon for `seed` as an SVG document.
pub fn identicon_svg(seed: &str) -> String {
    let digest = Sha256::digest(seed.as_bytes());
    let hue = u16::from_be_bytes([digest[0], digest[1]]) % 360;
    let saturation = 45 + digest[2] % 30;
    let lightness = 40 + digest[3] % 20;

    let mut svg = String::new();
    let _ = write!(
        svg,
        r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {GRID} {GRID}" shape-rendering="crispEdges"><rect width="{GRID}" height="{GRID}" fill="#f0f0f0"/>"##
    );
    let half = GRID.div_ceil(2);
    for row in 0..GRID {
        for col in 0..half {
            let bit = row * half + col;
            let on = digest[4 + bit / 8] >> (bit % 8) & 1 == 1;
            if !on {
                continue;
            }
            for x in [col, GRID - 1 - col] {
                let _ = write!(
                    svg,
                    r#"<rect x="{x}" y="{row}" width="1" height="1" fill="hsl({hue},{saturation}%,{lightness}%)"/>"#
                );
                if x == GRID - 1 - x {
                    break;
                }
            }
        }
    }
    svg.push_str("</svg>");
    svg
}

pub fn encode_svg(svg: &str) -> String {
    STANDARD.encode(svg.as_bytes())
}

pub fn generate_candidates(count: usize) -> Vec<String> {
    (0..count).map(|_| encode_svg(&identicon_svg(&random_seed()))).collect()
}

#[derive(Debug, Clone, Default)]
pub struct AvatarPicker {
    candidates: Vec<String>,
    selected: Option<usize>,
}

impl AvatarPicker {
    pub fn new() -> Self {
        Self::with_candidates(generate_candidates(CANDIDATE_COUNT))
    }

    pub fn with_candidates(candidates: Vec<String>) -> Self {
        Self { candidates, selected: None }
    }

    /// Fresh candidates, no uniqueness guarantee. Clears the selection.
    pub fn generate(&mut self) {
        self.candidates = generate_candidates(CANDIDATE_COUNT);
        self.selected = None;
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn select(&mut self, index: usize) -> Result<()> {
        if index >= self.candidates.len() {
            return Err(Error::validation("Please select an avatar"));
        }
        self.selected = Some(index);
        Ok(())
    }

    /// Submits the selected candidate for the session user and stores the
    /// backend's canonical image back into the session.
    pub async fn commit(&self, backend: &dyn ChatBackend, session: &SessionStore) -> Result<User> {
        let image = self
            .selected
            .and_then(|idx| self.candidates.get(idx))
            .ok_or_else(|| Error::validation("Please select an avatar"))?;
        let mut user = session.load()?.ok_or_else(|| Error::validation("Please log in first"))?;

        let resp = backend.set_avatar(&user.id, image).await?;
        if !resp.is_set {
            return Err(Error::Rejected("Error setting avatar. Please try again.".into()));
        }
        user.is_avatar_image_set = true;
        user.avatar_image = resp.image;
        session.save(&user)?;
        log::info!("avatar set for {}", user.username);
        Ok(user)
    }
}
