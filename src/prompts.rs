//! Prompt construction for the text and image models.

use crate::models::MenuItem;

pub const MENU_GENERATION: &str = include_str!("../data/prompts/menu_generation.txt");
pub const FOOD_PHOTO: &str = include_str!("../data/prompts/food_photo.txt");
pub const MENU_LAYOUT: &str = include_str!("../data/prompts/menu_layout.txt");
pub const MENU_COMPOSITION: &str = include_str!("../data/prompts/menu_composition.txt");

pub const DEFAULT_STYLE: &str = "modern";

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

/// Visual direction for a style name; unknown styles read as `modern`.
pub fn style_description(style: &str) -> &'static str {
    match style {
        "vintage" => "Vintage rustic style, chalkboard aesthetic, hand-drawn feel, warm colors",
        "elegant" => "Elegant upscale design, sophisticated fonts, gold accents, luxury feel",
        "casual" => "Casual friendly design, bright colors, fun fonts, approachable layout",
        _ => "Modern clean design, minimalist, sharp typography, high contrast",
    }
}

pub fn menu_generation_prompt(user_prompt: &str) -> String {
    render(MENU_GENERATION, &[("user_prompt", user_prompt)])
}

pub fn food_photo_prompt(name: &str, description: &str) -> String {
    let subject = if description.trim().is_empty() {
        name.to_string()
    } else {
        format!("{}, {}", name, description.trim())
    };
    render(FOOD_PHOTO, &[("subject", &subject)])
}

/// Text-only menu prompt; items with a photo are flagged so the model
/// leaves room for one.
pub fn menu_layout_prompt(restaurant_name: &str, items: &[MenuItem], style: &str) -> String {
    let sections = render_sections(items, |item, _| {
        item.has_image().then(|| " [with food photo]".to_string())
    });

    render(
        MENU_LAYOUT,
        &[
            ("restaurant_name", restaurant_name),
            ("sections", &sections),
            ("style", style_description(style)),
        ],
    )
}

/// Composition prompt referencing source photos by position. Positions
/// follow item order, matching [`crate::models::image_urls`].
pub fn menu_composition_prompt(restaurant_name: &str, items: &[MenuItem], style: &str) -> String {
    let sections = render_sections(items, |_, photo_index| {
        photo_index.map(|n| format!(" (photo: image {})", n))
    });

    render(
        MENU_COMPOSITION,
        &[
            ("restaurant_name", restaurant_name),
            ("sections", &sections),
            ("style", style_description(style)),
        ],
    )
}

pub fn format_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("${:.0}", price)
    } else {
        format!("${:.2}", price)
    }
}

/// Groups items by category in first-seen order. `annotate` receives each
/// item with its 1-based photo position, if it has one.
fn render_sections<F>(items: &[MenuItem], annotate: F) -> String
where
    F: Fn(&MenuItem, Option<usize>) -> Option<String>,
{
    let mut photo_positions = Vec::with_capacity(items.len());
    let mut next_photo = 0;
    for item in items {
        if item.has_image() {
            next_photo += 1;
            photo_positions.push(Some(next_photo));
        } else {
            photo_positions.push(None);
        }
    }

    let mut categories: Vec<(&str, Vec<usize>)> = Vec::new();
    for (index, item) in items.iter().enumerate() {
        match categories
            .iter()
            .position(|(name, _)| *name == item.category.as_str())
        {
            Some(pos) => categories[pos].1.push(index),
            None => categories.push((item.category.as_str(), vec![index])),
        }
    }

    let mut out = String::new();
    for (category, members) in categories {
        out.push_str(&category.to_uppercase());
        out.push_str(":\n");
        for index in members {
            let item = &items[index];
            out.push_str(&format!("- {} {}", item.name, format_price(item.price)));
            if !item.description.is_empty() {
                out.push_str(&format!(" - {}", item.description));
            }
            if let Some(note) = annotate(item, photo_positions[index]) {
                out.push_str(&note);
            }
            out.push('\n');
        }
        out.push('\n');
    }
    out
}
