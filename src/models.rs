// Domain types shared by the analysis client, session state machine,
// renderer and persistence layer.
//
// Field names serialize as camelCase because the same shapes are declared
// to the remote model as response schemas and are returned to the browser.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A user-visible, independently analyzable segment of the submitted material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: String,
    pub title: String,
    /// Raw text slice belonging to this chapter
    pub content: String,
    /// Flips to true once an analysis completes for this chapter
    #[serde(default)]
    pub studied: bool,
}

/// Analysis depth preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStyle {
    /// Extensive summary enriched with web search; no structured quiz
    Internet,
    Basic,
    #[default]
    Medium,
    Hard,
}

impl AnalysisStyle {
    pub const ALL: [AnalysisStyle; 4] = [
        AnalysisStyle::Internet,
        AnalysisStyle::Basic,
        AnalysisStyle::Medium,
        AnalysisStyle::Hard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internet => "internet",
            Self::Basic => "basic",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    /// Web-search augmentation replaces strict schema validation
    pub fn uses_web_search(&self) -> bool {
        matches!(self, Self::Internet)
    }
}

impl fmt::Display for AnalysisStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "internet" => Ok(Self::Internet),
            "basic" => Ok(Self::Basic),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(format!("unknown analysis style: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticalExample {
    pub title: String,
    pub description: String,
    pub analogy: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub explanation: String,
}

impl QuizQuestion {
    /// At least two options and a correct index that points into them
    pub fn is_well_formed(&self) -> bool {
        self.options.len() >= 2 && self.correct_index < self.options.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineItem {
    pub date: String,
    pub event: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindMapNode {
    pub concept: String,
    #[serde(default)]
    pub details: Vec<String>,
}

/// Web citation attached to a search-grounded response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingUrl {
    pub title: String,
    pub uri: String,
}

/// The structured study guide produced for one (chapter, style) request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseAnalysis {
    pub topic_title: String,
    /// Lightweight markup with `---PAGE---` separators
    pub summary: String,
    pub key_points: Vec<String>,
    pub examples: Vec<PracticalExample>,
    pub quiz: Vec<QuizQuestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Vec<TimelineItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mind_map: Option<Vec<MindMapNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding_urls: Option<Vec<GroundingUrl>>,
}

impl CourseAnalysis {
    /// Document carrying only the raw model text
    pub fn raw_text(topic_title: &str, summary: String) -> Self {
        Self {
            topic_title: topic_title.to_string(),
            summary,
            key_points: Vec::new(),
            examples: Vec::new(),
            quiz: Vec::new(),
            timeline: None,
            mind_map: None,
            grounding_urls: None,
        }
    }

    pub fn grounding_urls(&self) -> &[GroundingUrl] {
        self.grounding_urls.as_deref().unwrap_or(&[])
    }
}

/// How an analysis document was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Schema-validated JSON
    Structured,
    /// Free text with web-search citations
    Grounded,
    /// Schema validation failed; raw text shown as the summary
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
}

/// Signed-in user as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_parse_and_display() {
        for style in AnalysisStyle::ALL {
            assert_eq!(style.as_str().parse::<AnalysisStyle>().unwrap(), style);
        }
        assert_eq!(" Hard ".parse::<AnalysisStyle>().unwrap(), AnalysisStyle::Hard);
        assert!("extreme".parse::<AnalysisStyle>().is_err());
        assert!(AnalysisStyle::Internet.uses_web_search());
        assert!(!AnalysisStyle::Medium.uses_web_search());
    }

    #[test]
    fn test_quiz_question_well_formed() {
        let mut q = QuizQuestion {
            question: "2 + 2?".to_string(),
            options: vec!["3".to_string(), "4".to_string()],
            correct_index: 1,
            explanation: "Arithmetic".to_string(),
        };
        assert!(q.is_well_formed());

        q.correct_index = 2;
        assert!(!q.is_well_formed());

        q.correct_index = 0;
        q.options.truncate(1);
        assert!(!q.is_well_formed());
    }

    #[test]
    fn test_course_analysis_wire_names() {
        let json = r#"{
            "topicTitle": "Sorting",
            "summary": "A---PAGE---B",
            "keyPoints": ["stable"],
            "examples": [],
            "quiz": [{"question": "q", "options": ["a", "b"], "correctIndex": 0, "explanation": "e"}],
            "mindMap": [{"concept": "merge", "details": ["split", "join"]}]
        }"#;
        let analysis: CourseAnalysis = serde_json::from_str(json).unwrap();
        assert_eq!(analysis.topic_title, "Sorting");
        assert_eq!(analysis.quiz[0].correct_index, 0);
        assert!(analysis.timeline.is_none());
        assert_eq!(analysis.mind_map.as_ref().unwrap()[0].details.len(), 2);

        let back = serde_json::to_value(&analysis).unwrap();
        assert!(back.get("keyPoints").is_some());
        assert!(back.get("timeline").is_none());
    }

    #[test]
    fn test_user_profile_photo_url_name() {
        let user = UserProfile {
            uid: "u1".to_string(),
            email: None,
            display_name: Some("Ada".to_string()),
            photo_url: Some("https://example.com/a.png".to_string()),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["photoURL"], "https://example.com/a.png");
        assert_eq!(json["displayName"], "Ada");
    }
}
