use serde_json::json;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use taskboard_core::model::category::CategoryProgress;
use taskboard_core::{
    BoardConfig, Category, ChangeEvent, InvariantViolation, MemoryStorage, OrchestratorError,
    StoreError, Task, TaskBoard, DEFAULT_CATEGORY_ID,
};

fn board_with_work() -> TaskBoard {
    let board = TaskBoard::in_memory();
    board
        .orchestrator()
        .add_category(Category::new("c1", "Work", "#00f"))
        .unwrap();
    board
}

/// Referential integrity and counter bounds over the whole board.
fn assert_consistent(board: &TaskBoard) {
    let tasks = board.tasks().list();
    let categories = board.categories().list();
    for task in &tasks {
        let owner = categories
            .iter()
            .find(|category| category.id == task.category_id)
            .unwrap_or_else(|| panic!("task {} points at missing {}", task.id, task.category_id));
        assert!(owner.contains_task(&task.id), "{} not listed in {}", task.id, owner.id);
    }
    for category in &categories {
        for id in category.tasks() {
            let task = tasks
                .iter()
                .find(|task| &task.id == id)
                .unwrap_or_else(|| panic!("{} lists unknown task {id}", category.id));
            assert_eq!(task.category_id, category.id);
        }
        let checked = tasks
            .iter()
            .filter(|task| task.checked && task.category_id == category.id)
            .count();
        assert!(category.completed_tasks() <= category.tasks().len());
        assert_eq!(category.completed_tasks(), checked, "{}", category.id);
    }
}

#[test]
fn scenario_add_task_registers_membership() {
    let board = board_with_work();
    board
        .orchestrator()
        .add_task(Task::with_id("t1", "Ship", "c1"))
        .unwrap();

    let work = board.categories().find_by_id("c1").unwrap();
    assert_eq!(work.tasks(), ["t1".to_string()]);
    assert_eq!(work.completed_tasks(), 0);
    assert_consistent(&board);
}

#[test]
fn scenario_toggle_recounts_category() {
    let board = board_with_work();
    let orchestrator = board.orchestrator();
    orchestrator
        .add_task(Task::with_id("t1", "Ship", "c1"))
        .unwrap();

    let toggled = orchestrator.toggle_task_check_status("t1").unwrap().unwrap();
    assert!(toggled.checked);

    let work = board.categories().find_by_id("c1").unwrap();
    assert_eq!(work.completed_tasks(), 1);
    assert_eq!(work.completion_percentage(), 100);

    orchestrator.toggle_task_check_status("t1").unwrap();
    assert_eq!(board.categories().completion_percentage("c1"), Some(0));
    assert!(orchestrator.toggle_task_check_status("nope").unwrap().is_none());
    assert_consistent(&board);
}

#[test]
fn scenario_delete_category_moves_tasks_to_default() {
    let board = board_with_work();
    let orchestrator = board.orchestrator();
    orchestrator
        .add_task(Task::with_id("t1", "Ship", "c1"))
        .unwrap();
    orchestrator.toggle_task_check_status("t1").unwrap();

    let removed = orchestrator.delete_category("c1").unwrap().unwrap();
    assert_eq!(removed.id, "c1");

    assert_eq!(
        board.tasks().find_by_id("t1").unwrap().category_id,
        DEFAULT_CATEGORY_ID
    );
    let default = board.categories().default_category();
    assert!(default.contains_task("t1"));
    assert_eq!(default.completed_tasks(), 1);
    assert!(board.categories().find_by_id("c1").is_none());
    assert!(orchestrator.delete_category("c1").unwrap().is_none());
    assert_consistent(&board);
}

#[test]
fn deleted_category_reports_zeroed_progress_last() {
    let board = board_with_work();
    let orchestrator = board.orchestrator();
    orchestrator
        .add_task(Task::with_id("t1", "Ship", "c1"))
        .unwrap();
    orchestrator.toggle_task_check_status("t1").unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    board.categories().observe_progress(Some("c1"), move |progress| {
        sink.borrow_mut().push(progress.clone())
    });

    orchestrator.delete_category("c1").unwrap().unwrap();

    assert_eq!(
        seen.borrow().last(),
        Some(&CategoryProgress {
            category_id: "c1".to_string(),
            total: 0,
            completed: 0,
            percentage: 0,
        })
    );
}

#[test]
fn scenario_default_category_deletion_is_refused() {
    let board = board_with_work();
    board
        .orchestrator()
        .add_task(Task::with_id("t1", "Loose", ""))
        .unwrap();
    let tasks_before = board.tasks().list();
    let categories_before = board.categories().list();

    let err = board
        .orchestrator()
        .delete_category(DEFAULT_CATEGORY_ID)
        .unwrap_err();

    assert_eq!(
        err,
        OrchestratorError::Store(StoreError::InvariantViolation(
            InvariantViolation::DefaultCategoryProtected
        ))
    );
    assert_eq!(board.tasks().list(), tasks_before);
    assert_eq!(board.categories().list(), categories_before);
}

#[test]
fn add_task_rejects_unknown_category_without_writing() {
    let board = board_with_work();
    let err = board
        .orchestrator()
        .add_task(Task::with_id("t1", "Lost", "nowhere"))
        .unwrap_err();

    assert_eq!(err, OrchestratorError::CategoryNotFound("nowhere".to_string()));
    assert!(board.tasks().is_empty());
}

#[test]
fn add_task_with_blank_category_uses_default() {
    let board = TaskBoard::in_memory();
    let task = board
        .orchestrator()
        .add_task(Task::with_id("t1", "Loose", "  "))
        .unwrap();

    assert_eq!(task.category_id, DEFAULT_CATEGORY_ID);
    assert!(board.categories().default_category().contains_task("t1"));
}

#[test]
fn validation_errors_surface_and_leave_state_untouched() {
    let board = board_with_work();
    let err = board
        .orchestrator()
        .add_task(Task::with_id("t1", "", "c1"))
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::Store(StoreError::Validation(_))));
    assert!(board.categories().find_by_id("c1").unwrap().tasks().is_empty());
}

#[test]
fn update_task_moves_membership_between_categories() {
    let board = board_with_work();
    let orchestrator = board.orchestrator();
    orchestrator
        .add_category(Category::new("c2", "Home", "#0f0"))
        .unwrap();
    let mut task = orchestrator
        .add_task(Task::with_id("t1", "Ship", "c1"))
        .unwrap();
    orchestrator.toggle_task_check_status("t1").unwrap();

    task.checked = true;
    task.category_id = "c2".to_string();
    task.title = "Ship it".to_string();
    assert!(orchestrator.update_task(task).unwrap());

    let work = board.categories().find_by_id("c1").unwrap();
    let home = board.categories().find_by_id("c2").unwrap();
    assert!(work.tasks().is_empty());
    assert_eq!(work.completed_tasks(), 0);
    assert_eq!(home.tasks(), ["t1".to_string()]);
    assert_eq!(home.completed_tasks(), 1);
    assert_eq!(board.tasks().find_by_id("t1").unwrap().title, "Ship it");
    assert!(!orchestrator
        .update_task(Task::with_id("ghost", "Boo", "c1"))
        .unwrap());
    assert_consistent(&board);
}

#[test]
fn move_task_to_category_checks_both_ends() {
    let board = board_with_work();
    let orchestrator = board.orchestrator();
    orchestrator
        .add_task(Task::with_id("t1", "Ship", DEFAULT_CATEGORY_ID))
        .unwrap();

    let moved = orchestrator.move_task_to_category("t1", "c1").unwrap();
    assert_eq!(moved.category_id, "c1");
    assert!(board.categories().find_by_id("c1").unwrap().contains_task("t1"));
    assert!(!board.categories().default_category().contains_task("t1"));

    assert_eq!(
        orchestrator.move_task_to_category("nope", "c1").unwrap_err(),
        OrchestratorError::TaskNotFound("nope".to_string())
    );
    assert_eq!(
        orchestrator.move_task_to_category("t1", "nope").unwrap_err(),
        OrchestratorError::CategoryNotFound("nope".to_string())
    );
    assert_consistent(&board);
}

#[test]
fn delete_task_drops_membership_and_recounts() {
    let board = board_with_work();
    let orchestrator = board.orchestrator();
    for id in ["t1", "t2"] {
        orchestrator
            .add_task(Task::with_id(id, id, "c1"))
            .unwrap();
        orchestrator.toggle_task_check_status(id).unwrap();
    }

    let removed = orchestrator.delete_task("t1").unwrap().unwrap();
    assert_eq!(removed.id, "t1");

    let work = board.categories().find_by_id("c1").unwrap();
    assert_eq!(work.tasks(), ["t2".to_string()]);
    assert_eq!(work.completed_tasks(), 1);
    assert!(orchestrator.delete_task("t1").unwrap().is_none());
    assert!(orchestrator.delete_task("t1").unwrap().is_none());
    assert_consistent(&board);
}

#[test]
fn create_helpers_generate_ids() {
    let board = board_with_work();
    let orchestrator = board.orchestrator();

    let task = orchestrator.create_task_in_category("Plan", "c1").unwrap();
    assert!(!task.id.is_empty());
    assert!(board.categories().find_by_id("c1").unwrap().contains_task(&task.id));

    let (category, task) = orchestrator
        .create_task_with_new_category("Paint", "Hobby", None)
        .unwrap();
    assert!(category.color.starts_with('#'));
    assert_eq!(task.category_id, category.id);
    assert!(board.categories().find_by_name("Hobby").unwrap().contains_task(&task.id));

    let (colored, _) = orchestrator
        .create_task_with_new_category("Run", "Sport", Some("#123"))
        .unwrap();
    assert_eq!(colored.color, "#123");
    assert_consistent(&board);
}

#[test]
fn clear_completed_tasks_updates_categories() {
    let board = board_with_work();
    let orchestrator = board.orchestrator();
    for (id, category) in [("t1", "c1"), ("t2", "c1"), ("t3", DEFAULT_CATEGORY_ID)] {
        orchestrator
            .add_task(Task::with_id(id, id, category))
            .unwrap();
    }
    orchestrator.toggle_task_check_status("t1").unwrap();
    orchestrator.toggle_task_check_status("t3").unwrap();

    let removed = orchestrator.clear_completed_tasks().unwrap();

    let removed: HashSet<String> = removed.into_iter().map(|task| task.id).collect();
    assert_eq!(removed, HashSet::from(["t1".to_string(), "t3".to_string()]));
    let work = board.categories().find_by_id("c1").unwrap();
    assert_eq!(work.tasks(), ["t2".to_string()]);
    assert_eq!(work.completed_tasks(), 0);
    assert!(board.categories().default_category().tasks().is_empty());
    assert_consistent(&board);
}

#[test]
fn clear_all_tasks_empties_every_category() {
    let board = board_with_work();
    let orchestrator = board.orchestrator();
    orchestrator
        .add_task(Task::with_id("t1", "One", "c1"))
        .unwrap();
    orchestrator
        .add_task(Task::with_id("t2", "Two", ""))
        .unwrap();
    orchestrator.toggle_task_check_status("t1").unwrap();

    orchestrator.clear_all_tasks().unwrap();

    assert!(board.tasks().is_empty());
    for category in board.categories().list() {
        assert!(category.tasks().is_empty());
        assert_eq!(category.completed_tasks(), 0);
    }
    assert_eq!(board.categories().len(), 2);
}

#[test]
fn reconcile_repairs_drifted_storage() {
    let tasks = json!([
        {"id": "t1", "title": "Orphan", "checked": true, "categoryId": "gone"},
        {"id": "t2", "title": "Work", "checked": true, "categoryId": "c1"},
        {"id": "t3", "title": "Unlisted", "checked": false, "categoryId": "c1"}
    ]);
    let categories = json!([
        {"id": "default", "name": "Un-Categorized", "color": "var(--primary)", "tasks": ["t2"], "completedTasks": 0},
        {"id": "c1", "name": "Work", "color": "#00f", "tasks": ["stale", "t2"], "completedTasks": 0}
    ]);
    let storage = Rc::new(MemoryStorage::with_entries([
        ("todo-x-factr-tasks", tasks.to_string()),
        ("todo-x-factr-categories", categories.to_string()),
    ]));

    let board = TaskBoard::open(storage, BoardConfig::default(), None);

    let report = board.startup_report();
    assert_eq!(report.reassigned_tasks, vec!["t1".to_string()]);
    assert!(report.rebuilt_categories.contains(&"c1".to_string()));
    assert!(report.rebuilt_categories.contains(&DEFAULT_CATEGORY_ID.to_string()));
    assert_eq!(
        board.categories().find_by_id("c1").unwrap().tasks(),
        ["t2".to_string(), "t3".to_string()]
    );
    assert_eq!(
        board.categories().default_category().tasks(),
        ["t1".to_string()]
    );
    assert_consistent(&board);
    assert!(board.orchestrator().reconcile().is_clean());
}

#[test]
fn orchestrator_recount_wins_over_listener_write_back() {
    let board = Rc::new(board_with_work());
    board
        .orchestrator()
        .add_task(Task::with_id("t1", "Ship", "c1"))
        .unwrap();

    // A view that writes back a wrong count while the toggle is in flight.
    let observed = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&observed);
    let weak = Rc::downgrade(&board);
    board
        .events()
        .subscribe("taskUpdated", move |event: &ChangeEvent| {
            let Some(board) = weak.upgrade() else {
                return;
            };
            let Some(task) = event.task() else {
                return;
            };
            board
                .categories()
                .set_completed_count(&task.category_id, 0)
                .unwrap();
            let count = board
                .categories()
                .find_by_id(&task.category_id)
                .map(|category| category.completed_tasks());
            sink.borrow_mut().push(count);
        });

    board.orchestrator().toggle_task_check_status("t1").unwrap();

    assert_eq!(*observed.borrow(), vec![Some(0)]);
    assert_eq!(
        board.categories().find_by_id("c1").unwrap().completed_tasks(),
        1
    );
    assert_consistent(&board);
}

#[test]
fn every_event_of_a_call_is_delivered_before_it_returns() {
    let board = board_with_work();
    let names = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&names);
    board
        .events()
        .subscribe_all(move |event: &ChangeEvent| sink.borrow_mut().push(event.name()));

    board
        .orchestrator()
        .add_task(Task::with_id("t1", "Ship", "c1"))
        .unwrap();

    let names = names.borrow();
    assert_eq!(names.first().map(String::as_str), Some("taskAdded"));
    assert!(names.iter().any(|name| name == "categoryUpdated"));
}
