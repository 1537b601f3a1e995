//! Symptom classification into a specialty.

use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use shastho_core::config::TriageConfig;
use shastho_core::types::UserProfile;

use crate::client::{Content, GeminiClient, GenerateContentRequest, GenerationConfig};
use crate::personas::SpecialistId;

/// Reasoning shown when the service cannot classify; the flow falls back to
/// general medicine rather than failing.
pub const FALLBACK_REASONING: &str =
    "লক্ষণগুলো পরিষ্কারভাবে বোঝা না যাওয়ায় মেডিসিন বিশেষজ্ঞের কাছে পাঠানো হলো।";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub specialist_id: SpecialistId,
    pub reasoning: String,
}

impl Classification {
    fn fallback() -> Self {
        Self {
            specialist_id: SpecialistId::Medicine,
            reasoning: FALLBACK_REASONING.to_string(),
        }
    }
}

/// Classify the user's complaint. Never fails: any service or parse error
/// yields the medicine-specialist fallback so triage always progresses.
pub async fn classify(
    client: &GeminiClient,
    config: &TriageConfig,
    profile: &UserProfile,
) -> Classification {
    match try_classify(client, config, profile).await {
        Ok(classification) => {
            info!(specialist = classification.specialist_id.as_str(), "symptoms classified");
            classification
        }
        Err(e) => {
            warn!(error = %e, "classification failed, falling back to medicine");
            Classification::fallback()
        }
    }
}

async fn try_classify(
    client: &GeminiClient,
    config: &TriageConfig,
    profile: &UserProfile,
) -> anyhow::Result<Classification> {
    let request = GenerateContentRequest {
        contents: vec![Content::text(Some("user"), classification_prompt(profile))],
        system_instruction: None,
        generation_config: Some(GenerationConfig {
            temperature: Some(config.classify_temperature),
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(classification_schema()),
        }),
    };

    let response = client.generate_content(&config.model, &request).await?;
    let text = response
        .text()
        .ok_or_else(|| anyhow::anyhow!("empty classification response"))?;
    Ok(serde_json::from_str(&text)?)
}

/// Constrained output schema: the specialist id must come from the closed
/// set, and the reasoning is a short Bangla string.
fn classification_schema() -> serde_json::Value {
    let ids: Vec<&str> = SpecialistId::ALL.iter().map(|id| id.as_str()).collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "specialistId": {
                "type": "STRING",
                "enum": ids,
                "description": "The ID of the most suitable medical specialist based on the symptoms.",
            },
            "reasoning": {
                "type": "STRING",
                "description": "Brief reasoning for the selection in Bangla.",
            },
        },
        "required": ["specialistId", "reasoning"],
    })
}

/// The priority-ordered routing rules. Age under 16 always routes to the
/// pediatrician; gynecology is female-only; dermatology doubles as the
/// VD/sexual-health specialty; medicine is the general fallback.
fn classification_prompt(profile: &UserProfile) -> String {
    format!(
        r#"
User Profile:
Name: {name}
Age: {age} (If < 16, MUST be Pediatrician)
Gender: {gender}

Symptoms/Complaint: "{symptoms}"

Task:
1. Analyze the user's symptoms, Age, and Gender.
2. Classify them into EXACTLY ONE medical specialty from the list below.
3. Return ONLY the corresponding ID.

STRICT CLASSIFICATION LOGIC (Priority Order):

1. **Pediatrician ({pediatrician})**:
   - **CRITICAL RULE**: IF Age is LESS THAN 16 (0-15), YOU MUST SELECT THIS, regardless of the symptom (Fever, Cough, Pain, Sexual issues etc.), unless it is clearly a pregnancy issue for an adolescent female (then Gynae).
   - IF Age >= 16, DO NOT SELECT PEDIATRICIAN.

2. **Gynecologist ({gynecologist})**:
   - **FEMALE PATIENTS ONLY**.
   - Issues: Pregnancy, Menstruation/Period problems, Uterus, Vaginal discharge/itching/pain, Breast lumps/pain, Lower abdominal pain (female specific).

3. **Dermatologist ({dermatologist})**:
   - **SKIN**: Acne, Rash, Itching, Eczema, Hair fall, Fungal infection, Ringworm.
   - **SEXUAL HEALTH & VENEREAL DISEASES (VD)**:
     - **MALE GENITAL ISSUES**: Pain in penis, testicles, scrotum, foreskin issues.
     - **SEXUAL DYSFUNCTION**: Erectile dysfunction, premature ejaculation, weakness.
     - **STDs/STIs**: Syphilis, Gonorrhea, burning sensation in genitals, discharge from penis.
   - *Note: In this system, Dermatologist acts as the Sexologist/VD Specialist.*

4. **Psychiatrist ({psychiatrist})**:
   - Depression, Anxiety, Panic, Insomnia (Sleep issues), Stress, Hallucinations, Suicide thoughts, OCD, Mental instability.

5. **ENT Specialist ({ent})**:
   - Ear (pain, discharge, hearing loss), Nose (blockage, bleeding, polyps, sinus), Throat (pain, tonsils, voice change, difficulty swallowing).

6. **Cardiologist ({cardiologist})**:
   - Chest pain (especially left side/center/pressure), High Blood Pressure (Hypertension), Palpitations (fast heartbeat), Shortness of breath (heart related).

7. **Neurologist ({neurologist})**:
   - Severe Headache (Migraine), Vertigo/Dizziness, Stroke/Paralysis, Seizures/Epilepsy, Tremors, Numbness in hands/feet, Nerve pain, Memory loss.

8. **Gastroenterologist ({gastroenterologist})**:
   - Abdominal/Stomach pain, Gas/Acidity/Heartburn, Vomiting, Diarrhea, Constipation, Jaundice/Liver issues, Rectal bleeding, Piles/Fissure.

9. **Endocrinologist ({endocrinologist})**:
   - Diabetes, High Blood Sugar, Thyroid issues (Goiter, swelling neck, weight gain/loss), Hormonal imbalances, excessive thirst/hunger.

10. **Medicine Specialist ({medicine})**:
    - **GENERAL / FALLBACK**: Fever (Typhoid, Dengue, Viral), Cold/Flu (Adults), General weakness, Body aches, Joint pain (Arthritis), Urinary Tract Infections (Burning urine - if not clearly STI/VD), Kidney pain.
    - Use this ONLY if the symptom does not clearly fit the specialized categories above.

Reasoning Language: Bangla.
"#,
        name = profile.name,
        age = profile.age,
        gender = profile.gender,
        symptoms = profile.symptoms,
        pediatrician = SpecialistId::Pediatrician.as_str(),
        gynecologist = SpecialistId::Gynecologist.as_str(),
        dermatologist = SpecialistId::Dermatologist.as_str(),
        psychiatrist = SpecialistId::Psychiatrist.as_str(),
        ent = SpecialistId::Ent.as_str(),
        cardiologist = SpecialistId::Cardiologist.as_str(),
        neurologist = SpecialistId::Neurologist.as_str(),
        gastroenterologist = SpecialistId::Gastroenterologist.as_str(),
        endocrinologist = SpecialistId::Endocrinologist.as_str(),
        medicine = SpecialistId::Medicine.as_str(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use shastho_core::config::GeminiConfig;

    fn profile(age: &str, gender: &str, symptoms: &str) -> UserProfile {
        UserProfile {
            name: "Test Patient".into(),
            age: age.into(),
            gender: gender.into(),
            symptoms: symptoms.into(),
        }
    }

    fn unreachable_client() -> GeminiClient {
        GeminiClient::new(&GeminiConfig {
            api_key: Some("test-key".into()),
            api_key_env: "SHASTHO_TEST_UNSET".into(),
            // Nothing listens here; requests fail fast.
            base_url: Some("http://127.0.0.1:1".into()),
        })
    }

    #[test]
    fn test_prompt_carries_pediatric_age_rule() {
        let prompt = classification_prompt(&profile("10", "male", "fever"));
        assert!(prompt.contains("Age: 10"));
        assert!(prompt.contains("LESS THAN 16"));
        assert!(prompt.contains("MUST SELECT THIS"));
        assert!(prompt.contains(SpecialistId::Pediatrician.as_str()));
    }

    #[test]
    fn test_prompt_carries_gynecology_rule() {
        let prompt = classification_prompt(&profile("30", "female", "missed period"));
        assert!(prompt.contains("FEMALE PATIENTS ONLY"));
        assert!(prompt.contains("Menstruation/Period problems"));
        assert!(prompt.contains(SpecialistId::Gynecologist.as_str()));
    }

    #[test]
    fn test_schema_enumerates_every_specialist() {
        let schema = classification_schema();
        let ids = schema["properties"]["specialistId"]["enum"]
            .as_array()
            .unwrap();
        assert_eq!(ids.len(), SpecialistId::ALL.len());
        assert!(ids.iter().any(|v| v == "pediatrician"));
        assert!(ids.iter().any(|v| v == "medicine"));
    }

    #[test]
    fn test_classification_parse() {
        let raw = r#"{"specialistId":"pediatrician","reasoning":"বয়স ১৬ বছরের কম।"}"#;
        let parsed: Classification = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.specialist_id, SpecialistId::Pediatrician);
    }

    #[tokio::test]
    async fn test_service_failure_falls_back_to_medicine() {
        let client = unreachable_client();
        let config = TriageConfig::default();
        let result = classify(&client, &config, &profile("30", "male", "fever")).await;
        assert_eq!(result.specialist_id, SpecialistId::Medicine);
        assert_eq!(result.reasoning, FALLBACK_REASONING);
    }
}
