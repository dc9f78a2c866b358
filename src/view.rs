//! Cursor and scroll movement for menus and text documents.
//!
//! Both work on a copy of the page's [`ViewMemory`] and return the new
//! value; `visible` is the number of content rows on screen.

use crate::menu::MenuPage;
use crate::models::ViewMemory;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollKey {
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
    End,
}

pub const TOP_OF_FILE: &str = "Reached the top of the file";
pub const END_OF_FILE: &str = "Reached end of file";

/// The view to draw `page` with: a page that has links always has one
/// selected.
pub fn menu_view(page: &MenuPage<'_>, mut view: ViewMemory) -> ViewMemory {
    if view.selected_line.is_none() {
        view.selected_line = page.first_link;
    }
    view
}

/// Apply a movement key to a menu.
///
/// Up and Down step between links while they stay on screen and scroll
/// otherwise; the page keys scroll and then pick a link from the new window.
pub fn navigate_menu(
    page: &MenuPage<'_>,
    view: ViewMemory,
    key: ScrollKey,
    visible: usize,
) -> ViewMemory {
    let mut view = menu_view(page, view);
    let visible = visible.max(1);
    let len = page.len();
    let last_row = visible - 1;
    let max_offset = len.saturating_sub(last_row);

    match key {
        ScrollKey::Up => {
            let prev = match (view.selected_line, page.first_link) {
                (Some(sel), Some(first)) if sel > first => page.prev_link(sel),
                _ => None,
            };
            match prev {
                Some(prev) => {
                    if prev < view.scroll_offset {
                        view.scroll_offset = view.scroll_offset.saturating_sub(1);
                    }
                    if prev >= view.scroll_offset {
                        view.selected_line = Some(prev);
                    }
                }
                None => view.scroll_offset = view.scroll_offset.saturating_sub(1),
            }
        }
        ScrollKey::Down => {
            let window_end = view.scroll_offset + last_row;
            if view.selected_line.is_some_and(|sel| sel > window_end) {
                view.scroll_offset += 1;
                return view;
            }
            let next = match (view.selected_line, page.last_link) {
                (Some(sel), Some(last)) if sel < last => page.next_link(sel),
                _ => None,
            };
            let on_screen =
                |v: &ViewMemory, idx: usize| idx >= v.scroll_offset && idx <= v.scroll_offset + last_row;
            match next {
                Some(next) if on_screen(&view, next) => view.selected_line = Some(next),
                Some(next) => {
                    if view.scroll_offset < max_offset {
                        view.scroll_offset += 1;
                    }
                    if on_screen(&view, next) {
                        view.selected_line = Some(next);
                    }
                }
                None => {
                    if view.scroll_offset < max_offset {
                        view.scroll_offset += 1;
                    }
                }
            }
        }
        ScrollKey::PageUp => {
            view.scroll_offset = view.scroll_offset.saturating_sub(visible);
            let window = view.scroll_offset..(view.scroll_offset + visible).min(len);
            if view.selected_line.is_some_and(|sel| sel >= window.end) {
                if let Some(idx) = window.rev().find(|&i| page.is_selectable(i)) {
                    view.selected_line = Some(idx);
                }
            }
        }
        ScrollKey::PageDown => {
            if view.scroll_offset + visible < len {
                view.scroll_offset += visible;
            }
            let mut window = view.scroll_offset..(view.scroll_offset + visible).min(len);
            if view.selected_line.is_some_and(|sel| sel < window.start) {
                if let Some(idx) = window.find(|&i| page.is_selectable(i)) {
                    view.selected_line = Some(idx);
                }
            }
        }
        ScrollKey::Home => {
            if view.selected_line.is_some() {
                view.selected_line = page.first_link;
            }
            view.scroll_offset = 0;
        }
        ScrollKey::End => {
            if view.selected_line.is_some() {
                view.selected_line = page.last_link;
            }
            view.scroll_offset = max_offset;
        }
    }
    view
}

/// Apply a movement key to a text document of `line_count` wrapped lines.
/// Returns a notice when the key hit either end of the document.
pub fn scroll_text(
    line_count: usize,
    mut view: ViewMemory,
    key: ScrollKey,
    visible: usize,
) -> (ViewMemory, Option<&'static str>) {
    let visible = visible.max(1);
    let page = visible.saturating_sub(1).max(1);
    let at_end = line_count < view.scroll_offset + visible;
    let mut notice = None;

    match key {
        ScrollKey::Up | ScrollKey::PageUp if view.scroll_offset == 0 => notice = Some(TOP_OF_FILE),
        ScrollKey::Up => view.scroll_offset -= 1,
        ScrollKey::PageUp => view.scroll_offset = view.scroll_offset.saturating_sub(page),
        ScrollKey::Down | ScrollKey::PageDown if at_end => notice = Some(END_OF_FILE),
        ScrollKey::Down => view.scroll_offset += 1,
        ScrollKey::PageDown => view.scroll_offset += page,
        ScrollKey::Home => view.scroll_offset = 0,
        ScrollKey::End => {}
    }
    (view, notice)
}
