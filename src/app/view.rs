// SPDX-License-Identifier: MPL-2.0
//! View rendering for the application.
//!
//! Two panes side by side: the file tree on the left and the preview on the
//! right, with the list position underneath. Fullscreen hides the tree.

use super::Message;
use crate::i18n::fluent::I18n;
use crate::media::MediaList;
use crate::ui::design_tokens::{spacing, typography};
use crate::ui::{file_tree, preview};
use iced::widget::{column, container, mouse_area, row, text};
use iced::{alignment, Element, Length};

/// Context required to render the application view.
pub struct ViewContext<'a> {
    pub i18n: &'a I18n,
    pub tree: &'a file_tree::State,
    pub preview: &'a preview::State,
    pub media: &'a MediaList,
    pub fullscreen: bool,
    pub tree_width: f32,
}

/// Renders the window content.
pub fn view(ctx: ViewContext<'_>) -> Element<'_, Message> {
    let preview = mouse_area(ctx.preview.view(ctx.i18n).map(Message::Preview))
        .on_scroll(Message::PreviewScrolled);

    let preview_pane: Element<'_, Message> = match position_label(ctx.media, ctx.i18n) {
        Some(label) => column![
            preview,
            container(text(label).size(typography::CAPTION))
                .width(Length::Fill)
                .align_x(alignment::Horizontal::Center)
                .padding(spacing::XXS),
        ]
        .into(),
        None => preview.into(),
    };

    if ctx.fullscreen {
        return container(preview_pane)
            .width(Length::Fill)
            .height(Length::Fill)
            .into();
    }

    let tree = container(ctx.tree.view(ctx.i18n).map(Message::Tree))
        .width(Length::Fixed(ctx.tree_width))
        .height(Length::Fill);

    row![tree, preview_pane]
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

/// "index / total" for the current entry, marking either end of the list.
fn position_label(media: &MediaList, i18n: &I18n) -> Option<String> {
    let index = media.current_index()?;
    let index = (index + 1).to_string();
    let total = media.len().to_string();

    let mut parts = vec![i18n.tr_with_args(
        "nav-position",
        &[("index", index.as_str()), ("total", total.as_str())],
    )];
    if media.is_at_first() {
        parts.push(i18n.tr("nav-first"));
    }
    if media.is_at_last() {
        parts.push(i18n.tr("nav-last"));
    }
    Some(parts.join(" · "))
}
