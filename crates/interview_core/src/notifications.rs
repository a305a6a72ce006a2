//! crates/interview_core/src/notifications.rs
//!
//! Email bodies sent by the service.

use crate::ports::OutgoingEmail;

const BRAND: &str = "AI Interview Practice";

pub fn otp_email(to: &str, code: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "Your Login Code".to_string(),
        html: format!(
            "<h2>Your verification code</h2>\n\
             <p>Your code is: <strong>{code}</strong></p>\n\
             <p>This code will expire in 10 minutes.</p>"
        ),
    }
}

pub fn welcome_email(to: &str, name: &str) -> OutgoingEmail {
    let name = escape_html(name);
    OutgoingEmail {
        to: to.to_string(),
        subject: format!("Welcome to {BRAND}"),
        html: format!(
            "<h2>Welcome, {name}!</h2>\n\
             <p>Thanks for joining {BRAND}. Set up your first mock interview by choosing \
             a job title, a company and how many questions you want to practise.</p>\n\
             <p>When you finish, you will get a grade and written feedback on your answers.</p>"
        ),
    }
}

/// The name comes from the address's local part, which the user controls.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_email_carries_the_code() {
        let email = otp_email("a@b.c", "004213");
        assert_eq!(email.to, "a@b.c");
        assert!(email.html.contains("<strong>004213</strong>"));
        assert!(email.html.contains("10 minutes"));
    }

    #[test]
    fn welcome_email_escapes_the_name() {
        let email = welcome_email("x@y.z", "<b>eve</b>&co");
        assert!(email.html.contains("Welcome, &lt;b&gt;eve&lt;/b&gt;&amp;co!"));
        assert!(!email.html.contains("<b>eve"));
    }
}
