//! Structured consultation report extraction.

use serde_json::json;
use tracing::{info, warn};

use shastho_core::config::TriageConfig;
use shastho_core::types::{ChatMessage, ChatRole, MedicalReport, UserProfile};

use crate::client::{Content, GeminiClient, GenerateContentRequest, GenerationConfig};

/// Extract a structured English report from the consultation transcript.
/// Never fails: any service or parse error yields the placeholder report.
pub async fn generate_report(
    client: &GeminiClient,
    config: &TriageConfig,
    profile: &UserProfile,
    transcript: &[ChatMessage],
) -> MedicalReport {
    match try_generate(client, config, profile, transcript).await {
        Ok(report) => {
            info!(diagnosis = %report.diagnosis, "report generated");
            report
        }
        Err(e) => {
            warn!(error = %e, "report generation failed");
            MedicalReport::fallback()
        }
    }
}

async fn try_generate(
    client: &GeminiClient,
    config: &TriageConfig,
    profile: &UserProfile,
    transcript: &[ChatMessage],
) -> anyhow::Result<MedicalReport> {
    let request = GenerateContentRequest {
        contents: vec![Content::text(
            Some("user"),
            report_prompt(profile, transcript),
        )],
        system_instruction: None,
        generation_config: Some(GenerationConfig {
            temperature: None,
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(report_schema()),
        }),
    };

    let response = client.generate_content(&config.model, &request).await?;
    let text = response
        .text()
        .ok_or_else(|| anyhow::anyhow!("empty report response"))?;
    Ok(serde_json::from_str(&text)?)
}

fn report_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "diagnosis": { "type": "STRING" },
            "summary": { "type": "STRING" },
            "advice": { "type": "ARRAY", "items": { "type": "STRING" } },
            "medications": { "type": "ARRAY", "items": { "type": "STRING" } },
            "tests": { "type": "ARRAY", "items": { "type": "STRING" } },
        },
        "required": ["diagnosis", "summary", "advice", "medications", "tests"],
    })
}

/// The report is requested in English regardless of the consultation
/// language so the exported document renders with standard fonts.
fn report_prompt(profile: &UserProfile, transcript: &[ChatMessage]) -> String {
    let conversation: String = transcript
        .iter()
        .map(|message| {
            let speaker = match message.role {
                ChatRole::User => "Patient",
                ChatRole::Model => "Doctor",
            };
            format!("{speaker}: {}\n", message.text)
        })
        .collect();

    format!(
        r#"
Analyze the following doctor-patient conversation (which may be in Bangla) and generate a structured medical report in ENGLISH.

Patient Details:
Name: {name}
Age: {age}
Gender: {gender}

Conversation History:
{conversation}

Task:
Extract the following information and translate it into clear, professional ENGLISH for a medical record:
1. **diagnosis**: A short provisional diagnosis (e.g., Viral Fever, Migraine, Gastritis). If unclear, write "Observation needed".
2. **summary**: A 2-line summary of the patient's main complaints and history in English.
3. **advice**: A list of lifestyle advice given (e.g., drink water, rest) in English.
4. **medications**: A list of suggested OTC medications mentioned. If none, return empty list. Translate instructions to English.
5. **tests**: A list of suggested lab tests in English. If none, return empty list.

Return ONLY valid JSON.
"#,
        name = profile.name,
        age = profile.age,
        gender = profile.gender,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use shastho_core::config::GeminiConfig;

    fn test_profile() -> UserProfile {
        UserProfile {
            name: "Karima".into(),
            age: "25".into(),
            gender: "female".into(),
            symptoms: "headache".into(),
        }
    }

    fn test_transcript() -> Vec<ChatMessage> {
        vec![
            ChatMessage::user("matha betha korche", None),
            ChatMessage::model("kotodin dhore?"),
        ]
    }

    #[test]
    fn test_prompt_renders_speakers_and_requests_english() {
        let prompt = report_prompt(&test_profile(), &test_transcript());
        assert!(prompt.contains("Patient: matha betha korche"));
        assert!(prompt.contains("Doctor: kotodin dhore?"));
        assert!(prompt.contains("ENGLISH"));
        assert!(prompt.contains("Name: Karima"));
    }

    #[test]
    fn test_schema_requires_all_sections() {
        let schema = report_schema();
        let required = schema["required"].as_array().unwrap();
        for field in ["diagnosis", "summary", "advice", "medications", "tests"] {
            assert!(required.iter().any(|v| v == field), "{field}");
        }
    }

    #[test]
    fn test_report_parse() {
        let raw = r#"{"diagnosis":"Migraine","summary":"Recurrent headaches.","advice":["rest"],"medications":[],"tests":["CBC"]}"#;
        let report: MedicalReport = serde_json::from_str(raw).unwrap();
        assert_eq!(report.diagnosis, "Migraine");
        assert_eq!(report.tests, vec!["CBC"]);
    }

    #[tokio::test]
    async fn test_failure_yields_placeholder_report() {
        let client = GeminiClient::new(&GeminiConfig {
            api_key: Some("test-key".into()),
            api_key_env: "SHASTHO_TEST_UNSET".into(),
            base_url: Some("http://127.0.0.1:1".into()),
        });
        let report = generate_report(
            &client,
            &TriageConfig::default(),
            &test_profile(),
            &test_transcript(),
        )
        .await;
        assert_eq!(report.diagnosis, "Unknown");
        assert_eq!(report.summary, "Report generation failed.");
        assert!(report.advice.is_empty());
        assert!(report.medications.is_empty());
        assert!(report.tests.is_empty());
    }
}
