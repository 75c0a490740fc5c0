//! Per-analysis quiz state: the growing question list and locked answers

use super::SessionError;
use crate::models::QuizQuestion;
use serde::Serialize;

/// Result of answering one question
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerState {
    pub index: usize,
    /// The option that was recorded (the first one chosen)
    pub selected: usize,
    pub correct: bool,
    pub correct_index: usize,
    pub explanation: String,
}

#[derive(Debug, Clone, Default)]
pub struct QuizBoard {
    questions: Vec<QuizQuestion>,
    answers: Vec<Option<usize>>,
    loading_more: bool,
}

impl QuizBoard {
    pub fn new(questions: Vec<QuizQuestion>) -> Self {
        let answers = vec![None; questions.len()];
        Self {
            questions,
            answers,
            loading_more: false,
        }
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    pub fn is_loading_more(&self) -> bool {
        self.loading_more
    }

    /// Record an answer. The first selection locks the question; later calls
    /// return the recorded state unchanged.
    pub fn answer(&mut self, index: usize, option: usize) -> Result<AnswerState, SessionError> {
        let question = self
            .questions
            .get(index)
            .ok_or(SessionError::QuestionOutOfRange(index))?;

        let selected = match self.answers[index] {
            Some(locked) => locked,
            None => {
                if option >= question.options.len() {
                    return Err(SessionError::OptionOutOfRange {
                        question: index,
                        option,
                    });
                }
                self.answers[index] = Some(option);
                option
            }
        };

        Ok(AnswerState {
            index,
            selected,
            correct: selected == question.correct_index,
            correct_index: question.correct_index,
            explanation: question.explanation.clone(),
        })
    }

    pub fn begin_loading_more(&mut self) -> Result<(), SessionError> {
        if self.loading_more {
            return Err(SessionError::Busy("more questions"));
        }
        self.loading_more = true;
        Ok(())
    }

    /// Append new questions; existing questions and answers are untouched
    pub fn finish_loading_more(&mut self, more: Vec<QuizQuestion>) -> usize {
        self.loading_more = false;
        let added = more.len();
        self.answers.extend(std::iter::repeat(None).take(added));
        self.questions.extend(more);
        added
    }

    pub fn cancel_loading_more(&mut self) {
        self.loading_more = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(text: &str, correct_index: usize) -> QuizQuestion {
        QuizQuestion {
            question: text.to_string(),
            options: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            correct_index,
            explanation: format!("because {}", text),
        }
    }

    #[test]
    fn test_answer_locks_first_selection() {
        let mut board = QuizBoard::new(vec![question("q1", 2)]);

        let first = board.answer(0, 1).unwrap();
        assert_eq!(first.selected, 1);
        assert!(!first.correct);
        assert_eq!(first.correct_index, 2);

        let second = board.answer(0, 2).unwrap();
        assert_eq!(second, first);
        assert_eq!(board.answers(), &[Some(1)]);
    }

    #[test]
    fn test_answer_rejects_out_of_range() {
        let mut board = QuizBoard::new(vec![question("q1", 0)]);
        assert!(matches!(
            board.answer(3, 0),
            Err(SessionError::QuestionOutOfRange(3))
        ));
        assert!(matches!(
            board.answer(0, 9),
            Err(SessionError::OptionOutOfRange { question: 0, option: 9 })
        ));
        assert_eq!(board.answers(), &[None]);
    }

    #[test]
    fn test_more_questions_is_additive() {
        let mut board = QuizBoard::new(vec![question("q1", 0), question("q2", 1)]);
        board.answer(1, 1).unwrap();

        board.begin_loading_more().unwrap();
        assert!(matches!(
            board.begin_loading_more(),
            Err(SessionError::Busy(_))
        ));

        let added = board.finish_loading_more(vec![question("q3", 2)]);
        assert_eq!(added, 1);
        assert_eq!(board.questions().len(), 3);
        assert_eq!(board.questions()[0].question, "q1");
        assert_eq!(board.answers(), &[None, Some(1), None]);
        assert!(!board.is_loading_more());
    }
}
