//! Emails sent by the CMS: password recovery and the public contact form.

use super::message::{escape_html, Email, Mailbox};
use crate::store::{Site, User};

/// Link that logs `user` back in through `/user/recovery/{id}/{hash}/`.
pub fn recovery_url(host: &str, user: &User) -> String {
    format!("{}/user/recovery/{}/{}/", host, user.id, user.user_hash)
}

/// Password recovery email, sent from the system sender to the user.
pub fn recovery_email(host: &str, sender: Mailbox, user: &User) -> Email {
    let url = recovery_url(host, user);
    let text = format!("Follow the link to recover your password:\n\n{}\n", url);
    let html = format!(
        "<html>\n  <head></head>\n  <body>\n    <p>Follow the link to recover your password:</p>\n    <p><a href=\"{}\">Recover password</a></p>\n  </body>\n</html>\n",
        escape_html(&url)
    );

    Email {
        from: sender,
        to: Mailbox::new(&user.name, &user.email),
        subject: "Password recovery".to_string(),
        text,
        html,
    }
}

/// Contact form message, sent on behalf of the visitor to the site owner.
pub fn contact_email(
    host: &str,
    visitor: Mailbox,
    site: &Site,
    subject: &str,
    message: &str,
) -> Email {
    let text = format!(
        "Sent by: {}\nSubject: {}\nMessage:\n\n{}\n",
        visitor, subject, message
    );
    let html_message = escape_html(message)
        .replace("\r\n", "<br/>")
        .replace('\n', "<br/>");
    let html = format!(
        "<html>\n  <head></head>\n  <body>\n    <p>Sent by: &quot;{}&quot; &lt;{}&gt;</p>\n    <p>Subject: {}</p>\n    <p>Message:</p>\n    <p>{}</p>\n  </body>\n</html>\n",
        escape_html(&visitor.name),
        escape_html(&visitor.address),
        escape_html(subject),
        html_message
    );

    Email {
        to: Mailbox::new(&site.content.site_owner, &site.content.site_email),
        from: visitor,
        subject: format!("Contact form {}", host),
        text,
        html,
    }
}
