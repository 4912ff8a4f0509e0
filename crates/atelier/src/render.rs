//! Drawing for slides, notes and the control panel shared by both windows.

use eframe::egui;

use crate::deck::{Deck, SlideRecord};
use crate::nav::StepHandle;
use crate::parser::REVEAL_MARKER;
use crate::protocol::AspectRatio;
use crate::sync::UiFlags;

const SLIDE_PADDING: f32 = 48.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Heading(u8),
    Bullet,
    Text,
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleLine<'a> {
    pub kind: LineKind,
    pub text: &'a str,
}

/// Lines of `content` visible at `step`. The n-th reveal line appears at
/// step n; everything else is always shown.
pub fn visible_lines(content: &str, step: StepHandle) -> Vec<VisibleLine<'_>> {
    let mut reveal_index = 0;
    let mut lines = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim_start();
        if let Some(text) = trimmed.strip_prefix(REVEAL_MARKER) {
            reveal_index += 1;
            if step.is_visible(reveal_index) {
                lines.push(VisibleLine {
                    kind: LineKind::Bullet,
                    text,
                });
            }
            continue;
        }
        lines.push(classify(trimmed));
    }
    lines
}

fn classify(line: &str) -> VisibleLine<'_> {
    if line.is_empty() {
        return VisibleLine {
            kind: LineKind::Blank,
            text: line,
        };
    }
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if (1..=3).contains(&hashes) && line[hashes..].starts_with(' ') {
        return VisibleLine {
            kind: LineKind::Heading(hashes as u8),
            text: line[hashes..].trim(),
        };
    }
    match line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        Some(text) => VisibleLine {
            kind: LineKind::Bullet,
            text,
        },
        None => VisibleLine {
            kind: LineKind::Text,
            text: line,
        },
    }
}

/// Largest rect of the given aspect ratio centered in `available`.
pub fn fit_aspect(available: egui::Rect, ratio: AspectRatio) -> egui::Rect {
    let r = ratio.ratio();
    let (w, h) = if available.width() / available.height() > r {
        (available.height() * r, available.height())
    } else {
        (available.width(), available.width() / r)
    };
    egui::Rect::from_center_size(available.center(), egui::vec2(w, h))
}

pub fn draw_slide(
    ui: &egui::Ui,
    slide: Option<&SlideRecord>,
    step: StepHandle,
    flags: UiFlags,
    available: egui::Rect,
) {
    let rect = if flags.is_fullscreen {
        available
    } else {
        fit_aspect(available.shrink(16.0), flags.aspect_ratio)
    };
    let visuals = ui.visuals();
    let painter = ui.painter();
    let rounding = if flags.is_fullscreen { 0.0 } else { 12.0 };
    painter.rect_filled(rect, rounding, visuals.extreme_bg_color);
    if flags.show_border {
        painter.rect_stroke(
            rect,
            rounding,
            visuals.widgets.noninteractive.bg_stroke,
            egui::StrokeKind::Inside,
        );
    }

    let Some(slide) = slide else {
        let galley = painter.layout_no_wrap(
            "No slides".to_string(),
            egui::FontId::proportional(24.0),
            visuals.weak_text_color(),
        );
        let pos = rect.center() - galley.rect.size() / 2.0;
        painter.galley(pos, galley, visuals.weak_text_color());
        return;
    };

    let short_side = if flags.aspect_ratio.is_vertical() {
        rect.width()
    } else {
        rect.height()
    };
    let scale = (short_side / 720.0).max(0.3);
    let content = rect.shrink(SLIDE_PADDING * scale);
    let color = visuals.text_color();
    let mut y = content.top();
    for line in visible_lines(&slide.content, step) {
        let (text, size) = match line.kind {
            LineKind::Heading(1) => (line.text.to_string(), 56.0),
            LineKind::Heading(2) => (line.text.to_string(), 42.0),
            LineKind::Heading(_) => (line.text.to_string(), 34.0),
            LineKind::Bullet => (format!("\u{2022} {}", line.text), 26.0),
            LineKind::Text => (line.text.to_string(), 26.0),
            LineKind::Blank => {
                y += 14.0 * scale;
                continue;
            }
        };
        let galley = painter.layout(
            text,
            egui::FontId::proportional(size * scale),
            color,
            content.width(),
        );
        let height = galley.rect.height();
        painter.galley(egui::pos2(content.left(), y), galley, color);
        y += height + 8.0 * scale;
        if y > content.bottom() {
            break;
        }
    }

    draw_step_dots(painter, step, rect, scale, visuals.weak_text_color());
}

/// One dot per step in the bottom-right corner, filled up to the current one.
fn draw_step_dots(
    painter: &egui::Painter,
    step: StepHandle,
    rect: egui::Rect,
    scale: f32,
    color: egui::Color32,
) {
    if step.total_steps == 0 {
        return;
    }
    let radius = 4.0 * scale;
    let gap = 14.0 * scale;
    let y = rect.bottom() - 20.0 * scale;
    let right = rect.right() - 20.0 * scale;
    for i in 1..=step.total_steps {
        let x = right - (step.total_steps - i) as f32 * gap;
        let center = egui::pos2(x, y);
        if step.is_visible(i) {
            painter.circle_filled(center, radius, color);
        } else {
            painter.circle_stroke(center, radius, egui::Stroke::new(1.0, color));
        }
    }
}

pub fn draw_notes(ui: &mut egui::Ui, notes: Option<&str>) {
    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| match notes {
            Some(text) => {
                ui.label(text);
            }
            None => {
                ui.weak("No notes for this slide");
            }
        });
}

/// What the control panel displays; built from either side's state.
#[derive(Debug, Clone, Copy)]
pub struct PanelModel {
    pub index: usize,
    pub total_slides: usize,
    pub step: usize,
    pub total_steps: usize,
    pub flags: UiFlags,
    pub at_start: bool,
    pub at_end: bool,
    pub popped_out: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    PrevStep,
    NextStep,
    PrevSlide,
    NextSlide,
    GoTo(usize),
    ToggleFullscreen,
    ToggleBorder,
    SetAspectRatio(AspectRatio),
    PopOut,
    PopIn,
}

pub fn position_label(model: &PanelModel) -> String {
    let mut label = format!("{}/{}", model.index + 1, model.total_slides);
    if model.total_steps > 0 {
        label.push_str(&format!(" \u{b7} {}/{}", model.step, model.total_steps));
    }
    label
}

pub fn panel_header(ui: &mut egui::Ui, model: &PanelModel, actions: &mut Vec<PanelAction>) {
    ui.horizontal(|ui| {
        if ui.button("\u{26f6}").on_hover_text("Toggle fullscreen").clicked() {
            actions.push(PanelAction::ToggleFullscreen);
        }
        if ui
            .selectable_label(model.flags.show_border, "\u{25a2}")
            .on_hover_text("Toggle border")
            .clicked()
        {
            actions.push(PanelAction::ToggleBorder);
        }
        egui::ComboBox::from_id_salt("aspect-ratio")
            .selected_text(model.flags.aspect_ratio.token())
            .width(64.0)
            .show_ui(ui, |ui| {
                for ratio in AspectRatio::ALL {
                    if ui
                        .selectable_label(ratio == model.flags.aspect_ratio, ratio.token())
                        .clicked()
                    {
                        actions.push(PanelAction::SetAspectRatio(ratio));
                    }
                }
            });
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if model.popped_out {
                if ui.button("\u{21f2}").on_hover_text("Pop back into main window").clicked() {
                    actions.push(PanelAction::PopIn);
                }
            } else if ui.button("\u{29c9}").on_hover_text("Pop out to separate window").clicked() {
                actions.push(PanelAction::PopOut);
            }
        });
    });
}

/// Navigation row. `titles` lists the slides offered in the jump menu.
pub fn panel_footer(
    ui: &mut egui::Ui,
    model: &PanelModel,
    titles: &[String],
    actions: &mut Vec<PanelAction>,
) {
    ui.horizontal(|ui| {
        let first_slide = model.index == 0;
        let last_slide = model.index + 1 >= model.total_slides;
        if ui.add_enabled(!first_slide, egui::Button::new("\u{21e4}")).clicked() {
            actions.push(PanelAction::PrevSlide);
        }
        if ui.add_enabled(!model.at_start, egui::Button::new("\u{2190}")).clicked() {
            actions.push(PanelAction::PrevStep);
        }
        if ui.add_enabled(!model.at_end, egui::Button::new("\u{2192}")).clicked() {
            actions.push(PanelAction::NextStep);
        }
        if ui.add_enabled(!last_slide, egui::Button::new("\u{21e5}")).clicked() {
            actions.push(PanelAction::NextSlide);
        }
        egui::ComboBox::from_id_salt("jump-to-slide")
            .selected_text(position_label(model))
            .show_ui(ui, |ui| {
                for (i, title) in titles.iter().enumerate() {
                    let label = format!("{}. {title}", i + 1);
                    if ui.selectable_label(i == model.index, label).clicked() {
                        actions.push(PanelAction::GoTo(i));
                    }
                }
            });
    });
}

pub fn slide_titles(deck: &Deck) -> Vec<String> {
    deck.iter().map(|s| s.heading().to_string()).collect()
}
