//! HTML bodies for notification emails, with plain-text alternatives.

use lazy_static::lazy_static;
use regex::Regex;

use crate::domains::bookings::models::Booking;
use crate::domains::listings::models::Listing;
use crate::domains::payments::models::Payment;
use crate::domains::users::models::User;
use crate::kernel::OutgoingEmail;

lazy_static! {
    static ref TAG_RE: Regex = Regex::new(r"(?s)<[^>]*>").unwrap();
    static ref BLANK_LINES_RE: Regex = Regex::new(r"\n{3,}").unwrap();
}

const SIGNATURE: &str = "<p>Best regards,<br>ALX Travel Team</p>";

/// Minimal escaping for values interpolated into the HTML bodies.
pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Drop tags, unescape the entities we emit and squeeze whitespace.
pub fn strip_tags(html: &str) -> String {
    let text = TAG_RE.replace_all(html, "");
    let text = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&");

    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    BLANK_LINES_RE
        .replace_all(lines.join("\n").trim(), "\n\n")
        .into_owned()
}

fn email(to: &str, subject: String, html_body: String) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject,
        text_body: strip_tags(&html_body),
        html_body,
    }
}

fn greeting(user: &User) -> String {
    format!(
        "<p>Dear {} {},</p>",
        escape_html(&user.first_name),
        escape_html(&user.last_name)
    )
}

fn booking_details(listing: &Listing, booking: &Booking, currency: &str) -> String {
    format!(
        r#"<h3>Booking Details:</h3>
<ul>
    <li><strong>Property:</strong> {}</li>
    <li><strong>Location:</strong> {}</li>
    <li><strong>Check-in:</strong> {}</li>
    <li><strong>Check-out:</strong> {}</li>
    <li><strong>Total Price:</strong> {} {}</li>
</ul>"#,
        escape_html(&listing.name),
        escape_html(&listing.location),
        booking.start_date,
        booking.end_date,
        currency,
        booking.total_price
    )
}

pub fn booking_created(guest: &User, listing: &Listing, booking: &Booking, currency: &str) -> OutgoingEmail {
    let html = format!(
        r#"<html>
<body>
<h2>Booking Created!</h2>
{}
<p>Your booking has been created successfully and is pending host confirmation.</p>
{}
<p>You will receive another email once the host confirms your booking.</p>
{}
</body>
</html>"#,
        greeting(guest),
        booking_details(listing, booking, currency),
        SIGNATURE
    );

    email(&guest.email, format!("Booking Created - {}", listing.name), html)
}

pub fn booking_confirmed(
    guest: &User,
    host: &User,
    listing: &Listing,
    booking: &Booking,
    currency: &str,
) -> OutgoingEmail {
    let html = format!(
        r#"<html>
<body>
<h2>Booking Confirmed!</h2>
{}
<p>Your booking has been confirmed by the host.</p>
{}
<h3>Host Information:</h3>
<ul>
    <li><strong>Name:</strong> {} {}</li>
    <li><strong>Email:</strong> {}</li>
    <li><strong>Phone:</strong> {}</li>
</ul>
<p>We hope you have a wonderful stay!</p>
{}
</body>
</html>"#,
        greeting(guest),
        booking_details(listing, booking, currency),
        escape_html(&host.first_name),
        escape_html(&host.last_name),
        escape_html(&host.email),
        escape_html(host.phone_number.as_deref().unwrap_or("N/A")),
        SIGNATURE
    );

    email(&guest.email, format!("Booking Confirmed - {}", listing.name), html)
}

pub fn payment_confirmed(payer: &User, listing: &Listing, booking: &Booking, payment: &Payment) -> OutgoingEmail {
    let html = format!(
        r#"<html>
<body>
<h2>Payment Confirmed!</h2>
{}
<p>Your payment has been successfully processed.</p>
<h3>Booking Details:</h3>
<ul>
    <li><strong>Property:</strong> {}</li>
    <li><strong>Location:</strong> {}</li>
    <li><strong>Check-in:</strong> {}</li>
    <li><strong>Check-out:</strong> {}</li>
    <li><strong>Duration:</strong> {} nights</li>
</ul>
<h3>Payment Details:</h3>
<ul>
    <li><strong>Amount Paid:</strong> {} {}</li>
    <li><strong>Transaction ID:</strong> {}</li>
    <li><strong>Payment Date:</strong> {}</li>
</ul>
<p>Thank you for choosing our service!</p>
{}
</body>
</html>"#,
        greeting(payer),
        escape_html(&listing.name),
        escape_html(&listing.location),
        booking.start_date,
        booking.end_date,
        booking.duration_days(),
        escape_html(&payment.currency),
        payment.amount,
        escape_html(payment.transaction_id.as_deref().unwrap_or("N/A")),
        payment.payment_date.format("%Y-%m-%d %H:%M"),
        SIGNATURE
    );

    email(
        &payer.email,
        format!("Payment Confirmation - Booking #{}", booking.booking_id),
        html,
    )
}

pub fn payment_failed(payer: &User, payment: &Payment) -> OutgoingEmail {
    let html = format!(
        r#"<html>
<body>
<h2>Payment Failed</h2>
{}
<p>Unfortunately, your payment could not be processed.</p>
<p><strong>Booking Reference:</strong> {}</p>
<p><strong>Amount:</strong> {} {}</p>
<p>Please try again or contact our support team for assistance.</p>
{}
</body>
</html>"#,
        greeting(payer),
        payment.booking_id,
        escape_html(&payment.currency),
        payment.amount,
        SIGNATURE
    );

    email(&payer.email, "Payment Failed - Action Required".to_string(), html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{BookingId, ListingId, PaymentId, PaymentMethodId, UserId};
    use crate::domains::bookings::models::BookingStatus;
    use crate::domains::payments::models::PaymentStatus;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;

    fn user(first: &str, email: &str, phone: Option<&str>) -> User {
        User {
            user_id: UserId::new(),
            username: first.to_lowercase(),
            email: email.to_string(),
            first_name: first.to_string(),
            last_name: "Tester".to_string(),
            phone_number: phone.map(String::from),
            password_hash: String::new(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn listing(host: &User) -> Listing {
        Listing {
            property_id: ListingId::new(),
            host_id: host.user_id,
            name: "Cozy <Loft>".to_string(),
            description: "Near the market".to_string(),
            location: "Addis Ababa".to_string(),
            price_per_night: Decimal::new(12000, 2),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn booking(listing: &Listing, guest: &User) -> Booking {
        Booking {
            booking_id: BookingId::new(),
            listing_id: listing.property_id,
            user_id: guest.user_id,
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 4).unwrap(),
            total_price: Decimal::new(36000, 2),
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_strip_tags() {
        let text = strip_tags("<p>Dear A &amp; B,</p>\n\n\n\n<ul><li><strong>X:</strong> 1</li></ul>");
        assert_eq!(text, "Dear A & B,\n\nX: 1");
    }

    #[test]
    fn test_booking_created_email() {
        let guest = user("Ada", "ada@example.com", None);
        let host = user("Hal", "hal@example.com", None);
        let listing = listing(&host);
        let booking = booking(&listing, &guest);

        let email = booking_created(&guest, &listing, &booking, "NGN");
        assert_eq!(email.to, "ada@example.com");
        assert_eq!(email.subject, "Booking Created - Cozy <Loft>");
        assert!(email.html_body.contains("Cozy &lt;Loft&gt;"));
        assert!(email.html_body.contains("NGN 360.00"));
        assert!(email.text_body.contains("Dear Ada Tester,"));
        assert!(email.text_body.contains("Check-in: 2025-06-01"));
        assert!(!email.text_body.contains("<li>"));
    }

    #[test]
    fn test_booking_confirmed_includes_host_contact() {
        let guest = user("Ada", "ada@example.com", None);
        let host = user("Hal", "hal@example.com", None);
        let listing = listing(&host);
        let booking = booking(&listing, &guest);

        let email = booking_confirmed(&guest, &host, &listing, &booking, "NGN");
        assert!(email.subject.starts_with("Booking Confirmed - "));
        assert!(email.text_body.contains("Email: hal@example.com"));
        assert!(email.text_body.contains("Phone: N/A"));
    }

    #[test]
    fn test_payment_emails() {
        let guest = user("Ada", "ada@example.com", Some("+251911000000"));
        let host = user("Hal", "hal@example.com", None);
        let listing = listing(&host);
        let booking = booking(&listing, &guest);
        let payment = Payment {
            payment_id: PaymentId::new(),
            booking_id: booking.booking_id,
            user_id: guest.user_id,
            amount: booking.total_price,
            currency: "NGN".to_string(),
            payment_status: PaymentStatus::Completed,
            transaction_id: Some("CHK-123".to_string()),
            chapa_reference: Some("booking-x".to_string()),
            payment_method_id: PaymentMethodId::new(),
            payment_date: Utc.with_ymd_and_hms(2025, 5, 20, 14, 30, 0).unwrap(),
            updated_at: Utc::now(),
        };

        let confirmed = payment_confirmed(&guest, &listing, &booking, &payment);
        assert_eq!(
            confirmed.subject,
            format!("Payment Confirmation - Booking #{}", booking.booking_id)
        );
        assert!(confirmed.text_body.contains("Amount Paid: NGN 360.00"));
        assert!(confirmed.text_body.contains("Payment Date: 2025-05-20 14:30"));
        assert!(confirmed.text_body.contains("Duration: 3 nights"));

        let failed = payment_failed(&guest, &payment);
        assert_eq!(failed.subject, "Payment Failed - Action Required");
        assert!(failed.text_body.contains(&booking.booking_id.to_string()));
    }
}
