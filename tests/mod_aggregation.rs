use bson::{Bson, doc};
use student_marks::aggregation::{Accumulator, GROUP_ID, Pipeline, Projection, Stage, run_pipeline};
use student_marks::engine::Engine;
use student_marks::query::{CmpOp, Filter, Order, SortSpec};

fn engine() -> Engine {
    let e = Engine::in_memory();
    let col = e.create_collection("students");
    col.save_document(doc! {"id": 1_i64, "name": "a", "marks": [{"subject": "M", "score": 80}, {"subject": "P", "score": 60}]}).unwrap();
    col.save_document(doc! {"id": 2_i64, "name": "b", "marks": [{"subject": "M", "score": 65}]}).unwrap();
    col.save_document(doc! {"id": 3_i64, "name": "c", "marks": []}).unwrap();
    e
}

#[test]
fn unwind_group_sort_limit_project() {
    let e = engine();
    let col = e.get_collection("students").unwrap();
    let p = Pipeline::new()
        .unwind("marks")
        .group(&["id", "name"], vec![("avg".into(), Accumulator::Avg("marks.score".into()))])
        .sort(vec![SortSpec::new("avg", Order::Asc)])
        .limit(1)
        .project(Projection::Include(vec![GROUP_ID.into()]));
    let out = col.aggregate(&p).unwrap();
    assert_eq!(out, vec![doc! {"_id": {"id": 2_i64, "name": "b"}}]);
}

#[test]
fn match_after_unwind_filters_rows() {
    let e = engine();
    let col = e.get_collection("students").unwrap();
    let p = Pipeline::new()
        .unwind("marks")
        .matching(Filter::eq("marks.subject", "M"))
        .group(&[], vec![("n".into(), Accumulator::Count), ("total".into(), Accumulator::Sum("marks.score".into()))]);
    let out = col.aggregate(&p).unwrap();
    assert_eq!(out, vec![doc! {"_id": Bson::Null, "n": 2_i64, "total": 145_i64}]);
}

#[test]
fn sum_with_doubles_is_double() {
    let rows = vec![doc! {"v": 1}, doc! {"v": 2.5}];
    let stages = [Stage::Group { keys: vec![], accumulators: vec![("s".into(), Accumulator::Sum("v".into()))] }];
    let out = run_pipeline(rows, &stages).unwrap();
    assert_eq!(out[0].get_f64("s").unwrap(), 3.5);
}

#[test]
fn match_on_computed_field() {
    let e = engine();
    let col = e.get_collection("students").unwrap();
    let p = Pipeline::new()
        .unwind("marks")
        .group(&["id"], vec![("hi".into(), Accumulator::Max("marks.score".into()))])
        .matching(Filter::cmp("hi", CmpOp::Gte, 75));
    let out = col.aggregate(&p).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].get_document(GROUP_ID).unwrap().get_i64("id").unwrap(), 1);
}

#[test]
fn bucket_auto_reports_actual_bounds() {
    let e = engine();
    let col = e.get_collection("students").unwrap();
    let out = col.aggregate(&Pipeline::new().unwind("marks").bucket_auto("marks.score", 2)).unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0], doc! {"_id": {"min": 60, "max": 65}, "count": 2_i64});
    assert_eq!(out[1], doc! {"_id": {"min": 80, "max": 80}, "count": 1_i64});
}
