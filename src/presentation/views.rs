//! Server-rendered HTML pages.

use crate::application::upload::UploadStore;
use crate::domain::card::Card;

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape(title),
        body
    )
}

pub fn register_page() -> String {
    layout(
        "Register",
        "<h1>Register</h1>\n\
         <form method=\"post\" action=\"/register\">\n\
         <label>Username <input name=\"username\" required></label>\n\
         <label>Password <input name=\"password\" type=\"password\" required></label>\n\
         <button type=\"submit\">Register</button>\n\
         </form>\n\
         <p><a href=\"/login\">Already registered? Log in</a></p>",
    )
}

pub fn login_page() -> String {
    layout(
        "Login",
        "<h1>Login</h1>\n\
         <form method=\"post\" action=\"/login\">\n\
         <label>Username <input name=\"username\" required></label>\n\
         <label>Password <input name=\"password\" type=\"password\" required></label>\n\
         <button type=\"submit\">Log in</button>\n\
         </form>\n\
         <p><a href=\"/register\">Create an account</a></p>",
    )
}

fn card_item(card: &Card) -> String {
    let mut item = format!(
        "<li class=\"card\"><a href=\"/cards/{}\"><strong>{}</strong></a>",
        card.id,
        escape(&card.name)
    );
    if let Some(card_type) = &card.card_type {
        item.push_str(&format!(" <span class=\"type\">{}</span>", escape(card_type)));
    }
    if let Some(rarity) = &card.rarity {
        item.push_str(&format!(" <span class=\"rarity\">{}</span>", escape(rarity)));
    }
    if let Some(image) = &card.image_path {
        item.push_str(&format!(
            "<br><img src=\"{}\" alt=\"{}\" width=\"200\">",
            escape(&UploadStore::public_url(image)),
            escape(&card.name)
        ));
    }
    item.push_str("</li>");
    item
}

pub fn dashboard_page(username: &str, cards: &[Card]) -> String {
    let list = if cards.is_empty() {
        "<p>No cards yet.</p>".to_string()
    } else {
        let items: Vec<String> = cards.iter().map(card_item).collect();
        format!("<ul class=\"cards\">\n{}\n</ul>", items.join("\n"))
    };
    let body = format!(
        "<h1>Cards of {}</h1>\n\
         <p><a href=\"/add\">Add a card</a> | <a href=\"/logout\">Log out</a></p>\n{}",
        escape(username),
        list
    );
    layout("Dashboard", &body)
}

pub fn add_card_page() -> String {
    layout(
        "New card",
        "<h1>New card</h1>\n\
         <form method=\"post\" action=\"/add\" enctype=\"multipart/form-data\">\n\
         <label>Name <input name=\"name\" required></label>\n\
         <label>Type <input name=\"type\"></label>\n\
         <label>Rarity <input name=\"rarity\"></label>\n\
         <label>Image <input name=\"image\" type=\"file\" accept=\"image/*\"></label>\n\
         <button type=\"submit\">Save</button>\n\
         </form>\n\
         <p><a href=\"/dashboard\">Back to dashboard</a></p>",
    )
}

pub fn card_page(card: &Card) -> String {
    let body = format!(
        "<h1>{}</h1>\n<ul>{}</ul>\n<p><a href=\"/dashboard\">Back to dashboard</a></p>",
        escape(&card.name),
        card_item(card)
    );
    layout(&card.name, &body)
}

pub fn error_page(title: &str, message: &str, back_link: &str) -> String {
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>\n<p><a href=\"{}\">Back</a></p>",
        escape(title),
        escape(message),
        escape(back_link)
    );
    layout(title, &body)
}
