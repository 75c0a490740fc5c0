//! Response schema declarations sent with structured requests

use serde_json::{json, Value};

fn string() -> Value {
    json!({ "type": "STRING" })
}

fn string_array() -> Value {
    json!({ "type": "ARRAY", "items": string() })
}

fn quiz_question() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "question": string(),
            "options": string_array(),
            "correctIndex": { "type": "INTEGER" },
            "explanation": string()
        },
        "required": ["question", "options", "correctIndex", "explanation"]
    })
}

/// `[{id, title, content}]`
pub fn chapters() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": string(),
                "title": string(),
                "content": string()
            },
            "required": ["id", "title", "content"]
        }
    })
}

/// Full study guide; timeline and mind map are optional
pub fn course_analysis() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "topicTitle": string(),
            "summary": string(),
            "keyPoints": string_array(),
            "examples": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": string(),
                        "description": string(),
                        "analogy": string()
                    }
                }
            },
            "quiz": { "type": "ARRAY", "items": quiz_question() },
            "timeline": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "date": string(),
                        "event": string(),
                        "description": string()
                    }
                }
            },
            "mindMap": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "concept": string(),
                        "details": string_array()
                    }
                }
            }
        },
        "required": ["topicTitle", "summary", "keyPoints", "examples", "quiz"]
    })
}

pub fn quiz_questions() -> Value {
    json!({ "type": "ARRAY", "items": quiz_question() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_analysis_required_fields() {
        let schema = course_analysis();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(
            required,
            vec!["topicTitle", "summary", "keyPoints", "examples", "quiz"]
        );
        assert_eq!(schema["properties"]["mindMap"]["type"], "ARRAY");
    }

    #[test]
    fn test_quiz_schema_uses_integer_index() {
        assert_eq!(
            quiz_questions()["items"]["properties"]["correctIndex"]["type"],
            "INTEGER"
        );
    }
}
