//! CSV export of the session's turn log.

use crate::error::Result;
use crate::store::TurnRecord;

const HEADER: [&str; 12] = [
    "session_id",
    "nrc",
    "grupo",
    "tema",
    "estudiante",
    "mensaje_usuario",
    "respuesta_ia",
    "usa_rag",
    "timestamp",
    "id",
    "feedback",
    "feedback_text",
];

/// Serialize the full in-memory turn log as UTF-8 CSV with a header row.
///
/// Optional fields serialize as empty cells so every row has the same shape.
pub fn to_csv(log: &[TurnRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER)?;

    for record in log {
        writer.write_record([
            record.session_id.as_str(),
            record.nrc.as_str(),
            record.grupo.as_str(),
            record.tema.as_str(),
            record.estudiante.as_str(),
            record.mensaje_usuario.as_str(),
            record.respuesta_ia.as_str(),
            if record.usa_rag { "true" } else { "false" },
            &record.timestamp.to_rfc3339(),
            &record.id.map(|id| id.to_string()).unwrap_or_default(),
            record.feedback.map(|r| r.as_str()).unwrap_or(""),
            record.feedback_text.as_deref().unwrap_or(""),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()).into())
}

/// Suggested download filename for a session's log.
pub fn suggested_filename(session_id: &str) -> String {
    format!("log_{}.csv", session_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Rating;
    use chrono::Utc;

    fn record(id: Option<i64>) -> TurnRecord {
        TurnRecord {
            session_id: "abcd1234".to_string(),
            nrc: "EST101".to_string(),
            grupo: "G1".to_string(),
            tema: "Distribución Normal".to_string(),
            estudiante: "Ana".to_string(),
            mensaje_usuario: "¿Qué es la media?".to_string(),
            respuesta_ia: "La media, $\\mu$, es el promedio.".to_string(),
            usa_rag: false,
            timestamp: Utc::now(),
            id,
            feedback: id.map(|_| Rating::Down),
            feedback_text: None,
        }
    }

    #[test]
    fn test_csv_has_header_and_one_row_per_turn() {
        let bytes = to_csv(&[record(Some(1)), record(None)]).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("session_id,nrc,grupo,tema,estudiante"));
        assert!(lines[1].contains("down"));
    }

    #[test]
    fn test_empty_log_exports_header_only() {
        let bytes = to_csv(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_suggested_filename() {
        assert_eq!(suggested_filename("abcd1234"), "log_abcd1234.csv");
    }
}
