//! Persona-scripted consultation chat.

use tracing::{info, warn};

use shastho_core::config::TriageConfig;
use shastho_core::types::{ChatMessage, ChatRole, InlineImage, UserProfile};

use crate::client::{
    Content, GeminiClient, GenerateContentRequest, GenerationConfig, InlinePart, Part,
};
use crate::personas::{specialist, Specialist, SpecialistId};

/// Shown when a send fails outright; the chat surface never sees an error.
pub const FALLBACK_REPLY: &str =
    "সাময়িক যান্ত্রিক ত্রুটির কারণে উত্তর দেওয়া যাচ্ছে না। কিছুক্ষণ পর চেষ্টা করুন।";

/// Shown when the model returns an empty turn.
pub const EMPTY_REPLY: &str = "দুঃখিত, আমি বুঝতে পারিনি। আবার বলুন।";

/// One stateful consultation with a simulated specialist.
///
/// Exactly one session is live per triage flow; starting a new one replaces
/// the old (the prior session is simply dropped).
pub struct ChatSession {
    client: GeminiClient,
    model: String,
    temperature: f64,
    persona: &'static Specialist,
    system_instruction: String,
    transcript: Vec<ChatMessage>,
}

impl ChatSession {
    /// Open a session seeded with the persona's instructions and the user's
    /// profile.
    pub fn start(
        client: GeminiClient,
        config: &TriageConfig,
        specialist_id: SpecialistId,
        profile: &UserProfile,
    ) -> Self {
        let persona = specialist(specialist_id);
        info!(specialist = specialist_id.as_str(), "consultation opened");
        Self {
            client,
            model: config.model.clone(),
            temperature: config.chat_temperature,
            persona,
            system_instruction: build_system_instruction(persona, profile),
            transcript: Vec::new(),
        }
    }

    pub fn persona(&self) -> &'static Specialist {
        self.persona
    }

    /// Scripted opening line from the specialist.
    pub fn greeting(&self) -> String {
        format!(
            "আসসালামু আলাইকুম। আমি {}, {}।\nআপনার সমস্যাটি বিস্তারিত বলুন, আমি সাহায্য করার চেষ্টা করছি।",
            self.persona.name, self.persona.specialty
        )
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Send one user turn (optionally with a photo) and return displayable
    /// reply text. Failures resolve to a fixed apology, never an error.
    pub async fn send_turn(&mut self, text: &str, image: Option<InlineImage>) -> String {
        self.transcript.push(ChatMessage::user(text, image));

        let request = GenerateContentRequest {
            contents: transcript_contents(&self.transcript),
            system_instruction: Some(Content::text(None, self.system_instruction.clone())),
            generation_config: Some(GenerationConfig {
                temperature: Some(self.temperature),
                response_mime_type: None,
                response_schema: None,
            }),
        };

        let reply = match self.client.generate_content(&self.model, &request).await {
            Ok(response) => response.text().unwrap_or_else(|| EMPTY_REPLY.to_string()),
            Err(e) => {
                warn!(error = %e, "chat turn failed");
                FALLBACK_REPLY.to_string()
            }
        };

        self.transcript.push(ChatMessage::model(reply.clone()));
        reply
    }
}

/// Map a transcript onto the wire format: user turns carry their optional
/// photo as a second part, model turns are text only.
fn transcript_contents(transcript: &[ChatMessage]) -> Vec<Content> {
    transcript
        .iter()
        .map(|message| {
            let role = match message.role {
                ChatRole::User => "user",
                ChatRole::Model => "model",
            };
            let mut parts = vec![Part {
                text: Some(message.text.clone()),
                inline_data: None,
            }];
            if let Some(image) = &message.image {
                parts.push(Part {
                    text: None,
                    inline_data: Some(InlinePart {
                        mime_type: image.mime_type.clone(),
                        data: image.data.clone(),
                    }),
                });
            }
            Content {
                role: Some(role.to_string()),
                parts,
            }
        })
        .collect()
}

fn build_system_instruction(persona: &Specialist, profile: &UserProfile) -> String {
    format!(
        r#"
{instructions}

USER CONTEXT:
Name: {name}
Age: {age}
Gender: {gender}
Initial Complaint: {symptoms}

IMPORTANT ROLES & BEHAVIOR:
1. **Language**: ALWAYS speak in Bangla (Bengali).
2. **Persona**: You are {doctor_name}, {specialty}. You are NOT an AI assistant. You are a real, experienced doctor sitting in a clinic.
3. **Tone**: Professional yet warm and confident. Use clinical authority. Do not sound robotic.
   - Instead of "I am an AI", say "আমি দেখছি" (I see) or "চিন্তার কারণ নেই" (No need to worry).
   - Use "বাবা/মা" for kids or young patients, and "আপনি" for adults.

MEDICAL GUIDELINES & PRESCRIPTIONS:
1. **OTC MEDICINES ALLOWED**: You **ARE PERMITTED** to suggest standard Over-The-Counter (OTC) medicines for symptom relief.
   - Examples: Napa/Ace (Paracetamol) for fever/pain, Orsaline for dehydration, Antacids/Seclo for gas, Histacin for mild allergy.
   - **Format**: When suggesting meds, write clearly: "ঔষধের নাম (Generic) - মাত্রা (Dosage) - কতদিন (Duration)".
2. **STRICT PROHIBITIONS**:
   - NO Antibiotics (Azithromycin, Cefixime, etc.).
   - NO Sedatives/Sleeping pills.
   - NO Steroids.
   - If these are needed, tell the patient: "এজন্য আপনাকে একজন ডাক্তারকে সরাসরি দেখিয়ে অ্যান্টিবায়োটিক বা বিশেষ ঔষধ নিতে হবে।"
3. **Diagnosis**: Give a "Provisional Diagnosis" (সম্ভাব্য রোগ) based on symptoms.
4. **Reports**: Suggest relevant lab tests (CBC, X-ray, USG) if diagnosis is unclear.

INTERACTION STYLE:
- Don't ask too many questions at once. 1 or 2 at a time.
- Keep responses concise (max 4-6 sentences) but informative.
- If it's an emergency, use ⚠️ and tell them to go to a hospital.
"#,
        instructions = persona.instructions,
        name = profile.name,
        age = profile.age,
        gender = profile.gender,
        symptoms = profile.symptoms,
        doctor_name = persona.name,
        specialty = persona.specialty,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use shastho_core::config::GeminiConfig;

    fn test_profile() -> UserProfile {
        UserProfile {
            name: "Rahim".into(),
            age: "30".into(),
            gender: "male".into(),
            symptoms: "fever and body ache".into(),
        }
    }

    fn unreachable_session() -> ChatSession {
        let client = GeminiClient::new(&GeminiConfig {
            api_key: Some("test-key".into()),
            api_key_env: "SHASTHO_TEST_UNSET".into(),
            base_url: Some("http://127.0.0.1:1".into()),
        });
        ChatSession::start(
            client,
            &TriageConfig::default(),
            SpecialistId::Medicine,
            &test_profile(),
        )
    }

    #[test]
    fn test_system_instruction_seeds_persona_and_profile() {
        let session = unreachable_session();
        assert!(session.system_instruction.contains("Dr. Arafat"));
        assert!(session.system_instruction.contains("Name: Rahim"));
        assert!(session.system_instruction.contains("Initial Complaint: fever and body ache"));
        assert!(session.system_instruction.contains("ALWAYS speak in Bangla"));
    }

    #[test]
    fn test_greeting_names_the_specialist() {
        let session = unreachable_session();
        let greeting = session.greeting();
        assert!(greeting.contains(session.persona().name));
        assert!(greeting.contains(session.persona().specialty));
    }

    #[test]
    fn test_transcript_contents_roles_and_images() {
        let messages = vec![
            ChatMessage::user(
                "dekhen to",
                Some(InlineImage {
                    mime_type: "image/jpeg".into(),
                    data: "QUJD".into(),
                }),
            ),
            ChatMessage::model("dekhchi"),
        ];
        let contents = transcript_contents(&messages);
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0].role.as_deref(), Some("user"));
        assert_eq!(contents[0].parts.len(), 2);
        assert!(contents[0].parts[1].inline_data.is_some());
        assert_eq!(contents[1].role.as_deref(), Some("model"));
        assert_eq!(contents[1].parts.len(), 1);
    }

    #[tokio::test]
    async fn test_send_turn_failure_returns_apology() {
        let mut session = unreachable_session();
        let reply = session.send_turn("jor hoyeche", None).await;
        assert_eq!(reply, FALLBACK_REPLY);
        // Both turns are still recorded so the transcript stays coherent.
        assert_eq!(session.transcript().len(), 2);
        assert_eq!(session.transcript()[0].role, ChatRole::User);
        assert_eq!(session.transcript()[1].role, ChatRole::Model);
    }
}
