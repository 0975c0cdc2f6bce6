use eframe::egui;

pub struct Palette {
    pub bg: egui::Color32,
    pub fg: egui::Color32,
    pub stroke: egui::Color32,
    pub hover: egui::Color32,
    pub active: egui::Color32,
    pub selection: egui::Color32,
}

impl Palette {
    pub fn new(is_dark: bool) -> Self {
        if is_dark {
            Self {
                bg: egui::Color32::from_rgb(22, 24, 28),
                fg: egui::Color32::WHITE,
                stroke: egui::Color32::from_gray(220),
                hover: egui::Color32::from_rgb(120, 200, 255),
                active: egui::Color32::from_rgb(0, 220, 160),
                selection: egui::Color32::from_rgb(0, 150, 255),
            }
        } else {
            Self {
                bg: egui::Color32::from_rgb(246, 246, 242),
                fg: egui::Color32::BLACK,
                stroke: egui::Color32::BLACK,
                hover: egui::Color32::from_rgb(140, 210, 255),
                active: egui::Color32::from_rgb(0, 230, 150),
                selection: egui::Color32::from_rgb(0, 170, 255),
            }
        }
    }
}

/// Banner colours (background, text) per message severity.
pub mod banner {
    use eframe::egui::Color32;

    pub const OK: (Color32, Color32) = (Color32::from_rgb(0, 200, 90), Color32::BLACK);
    pub const BUSY: (Color32, Color32) = (Color32::from_rgb(255, 200, 0), Color32::BLACK);
    pub const OFF: (Color32, Color32) = (Color32::from_gray(100), Color32::WHITE);
    pub const FAIL: (Color32, Color32) = (Color32::from_rgb(230, 50, 50), Color32::WHITE);
}

fn widget_visuals(
    visuals: &mut egui::style::WidgetVisuals,
    stroke_width: f32,
    stroke: egui::Color32,
    fill: egui::Color32,
    text: egui::Color32,
) {
    visuals.bg_stroke = egui::Stroke::new(stroke_width, stroke);
    visuals.rounding = egui::Rounding::ZERO;
    visuals.bg_fill = fill;
    visuals.weak_bg_fill = fill;
    visuals.fg_stroke = egui::Stroke::new(1.0, text);
}

pub fn apply_theme(ctx: &egui::Context, is_dark: bool) {
    let mut style = (*ctx.style()).clone();
    let palette = Palette::new(is_dark);

    style
        .text_styles
        .iter_mut()
        .for_each(|(text_style, font_id)| {
            font_id.size = match text_style {
                egui::TextStyle::Heading => 26.0,
                egui::TextStyle::Body | egui::TextStyle::Button => 15.0,
                _ => font_id.size,
            };
        });

    style.spacing.item_spacing = egui::vec2(10.0, 10.0);
    style.spacing.button_padding = egui::vec2(14.0, 8.0);

    let button_fill = if is_dark {
        egui::Color32::from_gray(34)
    } else {
        egui::Color32::WHITE
    };
    let widgets = &mut style.visuals.widgets;
    widget_visuals(&mut widgets.noninteractive, 2.0, palette.stroke, palette.bg, palette.fg);
    widget_visuals(&mut widgets.inactive, 2.0, palette.stroke, button_fill, palette.fg);
    widget_visuals(&mut widgets.hovered, 2.5, palette.stroke, palette.hover, egui::Color32::BLACK);
    widget_visuals(&mut widgets.active, 3.0, palette.stroke, palette.active, egui::Color32::BLACK);
    widgets.hovered.expansion = 1.0;

    style.visuals.selection.stroke = egui::Stroke::new(1.0, palette.stroke);
    style.visuals.selection.bg_fill = palette.selection;

    style.visuals.window_rounding = egui::Rounding::ZERO;
    style.visuals.window_stroke = egui::Stroke::new(2.0, palette.stroke);
    style.visuals.window_shadow = egui::Shadow {
        offset: egui::vec2(6.0, 6.0),
        blur: 0.0,
        spread: 0.0,
        color: palette.stroke,
    };
    style.visuals.window_fill = palette.bg;
    style.visuals.panel_fill = palette.bg;
    style.visuals.override_text_color = Some(palette.fg);

    ctx.set_style(style);
}
