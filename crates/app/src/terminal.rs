//! Interactive quiz runner on stdin/stdout.

use std::io::Write;

use quiz_core::model::{OptionMark, Question, Selection};
use services::{
    AdvanceTicket, AutoAdvanceTimer, QuizCommand, QuizLoopService, QuizState, ResultSummary,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// How the auto-advance wait after a correct answer ended.
enum Countdown {
    Fired(Option<AdvanceTicket>),
    /// The learner pressed Enter; `None` when stdin closed.
    Skipped(Option<String>),
}

pub struct Terminal {
    lines: Lines<BufReader<Stdin>>,
}

impl Terminal {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Plays until the learner quits or stdin closes.
    pub async fn run(
        &mut self,
        service: &mut QuizLoopService,
        timer: AutoAdvanceTimer,
    ) -> CliResult<()> {
        loop {
            let keep_going = match service.state() {
                QuizState::InProgress => self.play_question(service, timer).await?,
                QuizState::Results => self.results_menu(service).await?,
                _ => false,
            };
            if !keep_going {
                return Ok(());
            }
        }
    }

    async fn prompt(&mut self, label: &str) -> CliResult<Option<String>> {
        print!("{label}");
        std::io::stdout().flush()?;
        Ok(self.lines.next_line().await?)
    }

    async fn play_question(
        &mut self,
        service: &mut QuizLoopService,
        timer: AutoAdvanceTimer,
    ) -> CliResult<bool> {
        let Some(session) = service.session() else {
            return Ok(false);
        };
        let Some(question) = session.current_question().cloned() else {
            return Ok(false);
        };
        let progress = session.progress();
        println!();
        println!(
            "Question {}/{}  (score {})",
            progress.question_number, progress.total, progress.score
        );
        print_question(&question);

        let selection = loop {
            let Some(line) = self.prompt("Your answer: ").await? else {
                return Ok(false);
            };
            match parse_selection(&line, &question) {
                Some(selection) => break selection,
                None => println!(
                    "Enter option numbers between 1 and {}.",
                    question.options().len()
                ),
            }
        };

        let transition = match service
            .dispatch(QuizCommand::SubmitAnswer(selection.clone()))
            .await
        {
            Ok(transition) => transition,
            Err(err) => {
                println!("{}", err.user_message());
                return Ok(true);
            }
        };

        if let Some(ticket) = transition.auto_advance {
            println!("Correct! (Enter skips ahead)");
            let mut scheduled = timer.schedule(ticket);
            let outcome = tokio::select! {
                fired = scheduled.fired() => Countdown::Fired(fired),
                line = self.lines.next_line() => Countdown::Skipped(line?),
            };
            match outcome {
                Countdown::Fired(Some(ticket)) => {
                    service.dispatch(QuizCommand::AutoAdvance(ticket)).await?;
                }
                Countdown::Fired(None) => {}
                Countdown::Skipped(None) => return Ok(false),
                Countdown::Skipped(Some(_)) => {
                    scheduled.cancel();
                    service.dispatch(QuizCommand::Advance).await?;
                }
            }
            return Ok(true);
        }

        println!("Incorrect.");
        for (option, mark) in question.mark_options(&selection) {
            let tag = match mark {
                OptionMark::Correct => "[correct]",
                OptionMark::WronglySelected => "[your pick]",
                OptionMark::Neutral => "",
            };
            println!("  {option} {tag}");
        }
        println!("{}", question.explanation());
        if self.prompt("Press Enter to continue ").await?.is_none() {
            return Ok(false);
        }
        service.dispatch(QuizCommand::Advance).await?;
        Ok(true)
    }

    async fn results_menu(&mut self, service: &mut QuizLoopService) -> CliResult<bool> {
        let Some(summary) = service.results() else {
            return Ok(false);
        };
        print_summary(&summary);

        let mut choices = vec!["[r]estart"];
        if summary.has_wrong_answers {
            choices.push("re[v]iew mistakes");
        }
        if summary.has_next_batch {
            choices.push("[n]ext batch");
        }
        if service.can_save_subject() {
            choices.push("[s]ave as subject");
        }
        choices.push("[q]uit");

        let Some(choice) = self.prompt(&format!("{}: ", choices.join("  "))).await? else {
            return Ok(false);
        };
        let command = match choice.trim() {
            "r" => QuizCommand::Restart,
            "v" => QuizCommand::Review,
            "n" => QuizCommand::NextBatch,
            "s" => {
                let Some(name) = self.prompt("Subject name: ").await? else {
                    return Ok(false);
                };
                QuizCommand::SaveSubject(name)
            }
            "q" => return Ok(false),
            other => {
                println!("Unknown choice: {other}");
                return Ok(true);
            }
        };

        match service.dispatch(command).await {
            Ok(transition) => {
                if let Some(id) = transition.saved_subject {
                    println!("Saved subject {id}");
                }
            }
            Err(err) => println!("{}", err.user_message()),
        }
        Ok(true)
    }
}

fn print_question(question: &Question) {
    println!("{}", question.text());
    if question.is_multi_answer() {
        println!("(select all that apply, e.g. `1 3`)");
    }
    for (i, option) in question.options().iter().enumerate() {
        println!("  {}. {option}", i + 1);
    }
}

fn print_summary(summary: &ResultSummary) {
    println!();
    println!(
        "Score: {}/{} ({}%)  {}",
        summary.score,
        summary.total,
        summary.percentage,
        summary.feedback.message()
    );
}

/// Maps `1 3` or `1,3` to options; repeating a number deselects it.
fn parse_selection(line: &str, question: &Question) -> Option<Selection> {
    let mut selection = Selection::new();
    for token in line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
    {
        let index = token.parse::<usize>().ok()?.checked_sub(1)?;
        selection.toggle(question.options().get(index)?.clone());
    }
    Some(selection)
}
