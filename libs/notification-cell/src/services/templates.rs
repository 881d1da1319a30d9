use crate::models::{AppointmentDetails, NotificationKind};

const FOOTER: &str = "This is an automated message from MEDIBOT.\nFor support, contact us at support@medibot.com";

/// Subject and plain-text body for one notification.
pub fn render(kind: NotificationKind, details: &AppointmentDetails) -> (String, String) {
    match kind {
        NotificationKind::AppointmentRequest => appointment_request(details),
        NotificationKind::AppointmentConfirmation => appointment_confirmation(details),
        NotificationKind::AppointmentRejection => appointment_rejection(details),
    }
}

fn appointment_request(details: &AppointmentDetails) -> (String, String) {
    let subject = format!("New Appointment Request - {}", details.patient_name);

    let mut body = format!(
        "Hello {},\n\n\
         You have received a new appointment request from a patient.\n\n\
         Patient: {}\n\
         Email: {}\n\
         Phone: {}\n\n\
         Date: {}\n\
         Time: {}\n\
         Consultation Fee: ${:.2}\n\n\
         Reason for Visit: {}\n",
        details.doctor_name,
        details.patient_name,
        details.patient_email,
        details.patient_phone.as_deref().unwrap_or("Not provided"),
        details.appointment_date,
        details.appointment_time,
        details.consultation_fee,
        details.reason,
    );
    if let Some(symptoms) = &details.symptoms {
        body.push_str(&format!("Symptoms: {}\n", symptoms));
    }
    body.push_str("\nPlease log in to your doctor dashboard to approve or reject this request.\n\n");
    body.push_str(FOOTER);

    (subject, body)
}

fn appointment_confirmation(details: &AppointmentDetails) -> (String, String) {
    let subject = format!("Appointment Confirmed - {}", details.doctor_name);

    let mut body = format!(
        "Hello {},\n\n\
         Your appointment has been confirmed by {}.\n\n\
         Doctor: {}\n\
         Date: {}\n\
         Time: {}\n\
         Consultation Fee: ${:.2}\n\
         Appointment ID: #{}\n",
        details.patient_name,
        details.doctor_name,
        details.doctor_name,
        details.appointment_date,
        details.appointment_time,
        details.consultation_fee,
        details.appointment_id,
    );
    if let Some(link) = &details.meeting_link {
        body.push_str(&format!("Join Video Consultation: {}\n", link));
    }
    if let Some(notes) = &details.doctor_notes {
        body.push_str(&format!("Notes from your doctor: {}\n", notes));
    }
    body.push_str(
        "\nPlease join the video call 5 minutes before your scheduled time.\n\
         If you need to reschedule, contact us at least 24 hours in advance.\n\n",
    );
    body.push_str(FOOTER);

    (subject, body)
}

fn appointment_rejection(details: &AppointmentDetails) -> (String, String) {
    let subject = format!("Appointment Update - {}", details.doctor_name);

    let body = format!(
        "Hello {},\n\n\
         Unfortunately {} could not accept your appointment request for {} at {}.\n\n\
         Reason: {}\n\n\
         You can book another slot from your MEDIBOT dashboard.\n\n{}",
        details.patient_name,
        details.doctor_name,
        details.appointment_date,
        details.appointment_time,
        details.doctor_notes.as_deref().unwrap_or("The doctor is unavailable at the requested time."),
        FOOTER,
    );

    (subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn details() -> AppointmentDetails {
        AppointmentDetails {
            appointment_id: Uuid::new_v4(),
            patient_name: "Jane Doe".to_string(),
            patient_email: "jane@example.com".to_string(),
            patient_phone: None,
            doctor_name: "Dr. Sarah Johnson".to_string(),
            doctor_email: "sarah.johnson@medibot.com".to_string(),
            appointment_date: "2030-06-15".to_string(),
            appointment_time: "10:30".to_string(),
            reason: "Persistent cough".to_string(),
            symptoms: Some("dry cough for two weeks".to_string()),
            consultation_fee: 150.0,
            meeting_link: Some("https://medibot-meet.com/room/abc".to_string()),
            doctor_notes: None,
        }
    }

    #[test]
    fn test_request_template_lists_patient_details() {
        let (subject, body) = render(NotificationKind::AppointmentRequest, &details());

        assert_eq!(subject, "New Appointment Request - Jane Doe");
        assert!(body.contains("Reason for Visit: Persistent cough"));
        assert!(body.contains("Symptoms: dry cough for two weeks"));
        assert!(body.contains("Phone: Not provided"));
        assert!(body.contains("Consultation Fee: $150.00"));
    }

    #[test]
    fn test_confirmation_template_carries_link() {
        let (subject, body) = render(NotificationKind::AppointmentConfirmation, &details());

        assert_eq!(subject, "Appointment Confirmed - Dr. Sarah Johnson");
        assert!(body.contains("https://medibot-meet.com/room/abc"));
    }

    #[test]
    fn test_rejection_template_falls_back_to_default_reason() {
        let (_, body) = render(NotificationKind::AppointmentRejection, &details());
        assert!(body.contains("unavailable at the requested time"));
    }
}
