//! Integration tests for employees, departments and account administration

use axum::http::StatusCode;
use hr_service::models::Role;
use serde_json::{Value, json};

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::TestApp;

fn employee_body(department_id: i32, email: &str) -> Value {
    json!({
        "firstName": "John",
        "lastName": "Smith",
        "email": email,
        "phone": "+1 555 0100",
        "dateOfBirth": "1990-04-12",
        "gender": "Male",
        "address": "1 Main Street",
        "position": "Backend Engineer",
        "departmentId": department_id,
        "hireDate": "2024-01-15",
        "salary": 55000.0,
        "status": "Active",
        "emergencyContactName": "Mary Smith",
        "emergencyContactPhone": "+1 555 0199"
    })
}

#[tokio::test]
async fn created_employee_reads_back_identically() {
    let app = TestApp::new().await.unwrap();
    let token = app.admin_token().await;
    let engineering = app.department_id("Engineering").await;

    let (status, created) = app
        .post(
            "/api/v1/employees",
            Some(&token),
            employee_body(engineering, "John.Smith@HR.com"),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");

    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["employeeCode"], format!("EMP{id:04}"));
    assert_eq!(created["email"], "john.smith@hr.com");
    assert_eq!(created["department"]["name"], "Engineering");
    assert_eq!(created["hireDate"], "2024-01-15");
    assert_eq!(created["salary"], 55000.0);

    let (status, fetched) = app
        .get(&format!("/api/v1/employees/{id}"), &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn employee_validation_and_conflicts() {
    let app = TestApp::new().await.unwrap();
    let token = app.admin_token().await;
    let engineering = app.department_id("Engineering").await;

    let (status, body) = app
        .post(
            "/api/v1/employees",
            Some(&token),
            json!({
                "firstName": "",
                "lastName": "Smith",
                "email": "nope",
                "position": "Engineer",
                "departmentId": engineering,
                "hireDate": "2024-01-15",
                "salary": -1.0
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["firstName"].is_string());
    assert!(body["details"]["email"].is_string());
    assert!(body["details"]["salary"].is_string());

    let (status, body) = app
        .post(
            "/api/v1/employees",
            Some(&token),
            employee_body(9_999, "ghost@hr.com"),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Department not found");

    let (status, _) = app
        .post(
            "/api/v1/employees",
            Some(&token),
            employee_body(engineering, "dup@hr.com"),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app
        .post(
            "/api/v1/employees",
            Some(&token),
            employee_body(engineering, "DUP@hr.com"),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Employee with this email already exists");
}

#[tokio::test]
async fn employee_writes_require_directory_role() {
    let app = TestApp::new().await.unwrap();
    let engineering = app.department_id("Engineering").await;
    app.create_user("manager@hr.com", "secret1", Role::Manager, None)
        .await;
    let token = app.login("manager@hr.com", "secret1").await;

    let (status, _) = app
        .post(
            "/api/v1/employees",
            Some(&token),
            employee_body(engineering, "someone@hr.com"),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.create_user("people@hr.com", "secret1", Role::Hr, None)
        .await;
    let token = app.login("people@hr.com", "secret1").await;
    let (status, _) = app
        .post(
            "/api/v1/employees",
            Some(&token),
            employee_body(engineering, "someone@hr.com"),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn employee_list_paginates_and_filters() {
    let app = TestApp::new().await.unwrap();
    let token = app.admin_token().await;
    for i in 0..7 {
        app.create_employee(&format!("Worker{i}"), &format!("worker{i}@hr.com"))
            .await;
    }
    app.create_employee("Alice", "alice@hr.com").await;

    let (status, body) = app.get("/api/v1/employees?page=2&limit=3", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 8);
    assert_eq!(body["pagination"]["total_pages"], 3);
    assert_eq!(body["pagination"]["page"], 2);
    assert_eq!(body["employees"].as_array().unwrap().len(), 3);

    let (_, body) = app.get("/api/v1/employees?page=3&limit=3", &token).await;
    assert_eq!(body["employees"].as_array().unwrap().len(), 2);

    // out-of-range values are clamped rather than rejected
    let (status, body) = app.get("/api/v1/employees?page=0&limit=1000", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["limit"], 100);

    let (status, body) = app
        .get(
            "/api/v1/employees?page=9223372036854775807&limit=100",
            &token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["page"], i64::MAX);
    assert_eq!(body["pagination"]["total"], 8);
    assert!(body["employees"].as_array().unwrap().is_empty());

    let (_, body) = app.get("/api/v1/employees?search=ALICE", &token).await;
    let employees = body["employees"].as_array().unwrap();
    assert_eq!(employees.len(), 1);
    assert_eq!(employees[0]["email"], "alice@hr.com");

    let (_, body) = app.get("/api/v1/employees?search=EMP0001", &token).await;
    assert_eq!(body["pagination"]["total"], 1);

    let marketing = app.department_id("Marketing").await;
    let (_, body) = app
        .get(&format!("/api/v1/employees?department={marketing}"), &token)
        .await;
    assert_eq!(body["pagination"]["total"], 0);

    let (status, _) = app.get("/api/v1/employees?status=Sleeping", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleted_employee_disappears() {
    let app = TestApp::new().await.unwrap();
    let token = app.admin_token().await;
    let id = app.create_employee("Gone", "gone@hr.com").await;

    let (status, body) = app
        .delete(&format!("/api/v1/employees/{id}"), &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Employee deleted successfully");

    let (status, _) = app.get(&format!("/api/v1/employees/{id}"), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get("/api/v1/employees", &token).await;
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn employee_update_keeps_omitted_fields() {
    let app = TestApp::new().await.unwrap();
    let token = app.admin_token().await;
    let id = app.create_employee("Jane", "jane@hr.com").await;

    let (status, body) = app
        .put(
            &format!("/api/v1/employees/{id}"),
            &token,
            json!({ "position": "Staff Engineer", "salary": 70000.0, "firstName": "" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["position"], "Staff Engineer");
    assert_eq!(body["salary"], 70000.0);
    assert_eq!(body["firstName"], "Jane");
    assert_eq!(body["email"], "jane@hr.com");
}

#[tokio::test]
async fn employee_cannot_manage_themselves() {
    let app = TestApp::new().await.unwrap();
    let token = app.admin_token().await;
    let id = app.create_employee("Jane", "jane@hr.com").await;
    let boss = app.create_employee("Boss", "boss@hr.com").await;

    let (status, body) = app
        .put(
            &format!("/api/v1/employees/{id}"),
            &token,
            json!({ "managerId": id }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Employee cannot be their own manager");

    let (_, body) = app.get(&format!("/api/v1/employees/{id}"), &token).await;
    assert!(body["managerId"].is_null());

    let (status, body) = app
        .put(
            &format!("/api/v1/employees/{id}"),
            &token,
            json!({ "managerId": boss }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["managerId"], boss);
}

#[tokio::test]
async fn deleted_records_free_their_unique_names() {
    let app = TestApp::new().await.unwrap();
    let token = app.admin_token().await;

    let (status, _) = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({ "email": "gone@hr.com", "password": "s3cret!" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, body) = app.get("/api/v1/admin/users?limit=100", &token).await;
    let gone = body["users"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == "gone@hr.com")
        .unwrap()["id"]
        .as_i64()
        .unwrap();
    let (status, _) = app
        .delete(&format!("/api/v1/admin/users/{gone}"), &token)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({ "email": "gone@hr.com", "password": "s3cret!" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, created) = app
        .post("/api/v1/departments", Some(&token), json!({ "name": "Ops" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let ops = created["id"].as_i64().unwrap();
    app.delete(&format!("/api/v1/departments/{ops}"), &token)
        .await;
    let (status, body) = app
        .post("/api/v1/departments", Some(&token), json!({ "name": "Ops" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let (status, _) = app
        .post("/api/v1/departments", Some(&token), json!({ "name": "Ops" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let employee = app.create_employee("Jane", "jane@hr.com").await;
    app.delete(&format!("/api/v1/employees/{employee}"), &token)
        .await;
    let engineering = app.department_id("Engineering").await;
    let (status, body) = app
        .post(
            "/api/v1/employees",
            Some(&token),
            employee_body(engineering, "jane@hr.com"),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}

#[tokio::test]
async fn seeded_departments_are_listed_with_counts() {
    let app = TestApp::new().await.unwrap();
    let token = app.admin_token().await;
    app.create_employee("Jane", "jane@hr.com").await;

    let (status, body) = app.get("/api/v1/departments?limit=100", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 4);

    let departments = body["departments"].as_array().unwrap();
    let engineering = departments
        .iter()
        .find(|d| d["name"] == "Engineering")
        .unwrap();
    assert_eq!(engineering["employeeCount"], 1);
    assert_eq!(engineering["description"], "Engineering Department");

    let (_, body) = app.get("/api/v1/departments?search=market", &token).await;
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn department_lifecycle() {
    let app = TestApp::new().await.unwrap();
    let token = app.admin_token().await;

    let (status, created) = app
        .post(
            "/api/v1/departments",
            Some(&token),
            json!({ "name": "Legal", "description": "Contracts", "budget": 120000.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["isActive"], true);
    assert_eq!(created["employeeCount"], 0);
    let id = created["id"].as_i64().unwrap();

    let (status, body) = app
        .post(
            "/api/v1/departments",
            Some(&token),
            json!({ "name": "Legal" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Department with this name already exists");

    let (status, updated) = app
        .put(
            &format!("/api/v1/departments/{id}"),
            &token,
            json!({ "goals": "Zero open disputes", "isActive": false }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["goals"], "Zero open disputes");
    assert_eq!(updated["isActive"], false);
    assert_eq!(updated["description"], "Contracts");

    let (status, _) = app
        .delete(&format!("/api/v1/departments/{id}"), &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .get(&format!("/api/v1/departments/{id}"), &token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn department_with_employees_cannot_be_deleted() {
    let app = TestApp::new().await.unwrap();
    let token = app.admin_token().await;
    let engineering = app.department_id("Engineering").await;
    app.create_employee("Jane", "jane@hr.com").await;

    let (status, body) = app
        .delete(&format!("/api/v1/departments/{engineering}"), &token)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["message"],
        "Cannot delete department with existing employees"
    );
}

#[tokio::test]
async fn last_admin_cannot_be_deleted_or_demoted() {
    let app = TestApp::new().await.unwrap();
    let token = app.admin_token().await;

    let (_, body) = app.get("/api/v1/admin/users", &token).await;
    let admin_id = body["users"][0]["id"].as_i64().unwrap();

    let (status, body) = app
        .delete(&format!("/api/v1/admin/users/{admin_id}"), &token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot delete the last admin user");

    let (status, _) = app
        .put(
            &format!("/api/v1/admin/users/{admin_id}"),
            &token,
            json!({ "role": "hr" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .put(
            &format!("/api/v1/admin/users/{admin_id}"),
            &token,
            json!({ "isActive": false }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleted_admin_is_no_longer_listed() {
    let app = TestApp::new().await.unwrap();
    let token = app.admin_token().await;
    let second = app
        .create_user("second.admin@hr.com", "secret1", Role::Admin, None)
        .await;

    let (status, body) = app
        .delete(&format!("/api/v1/admin/users/{second}"), &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User deleted successfully");

    let (_, body) = app.get("/api/v1/admin/users", &token).await;
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert!(users.iter().all(|u| u["id"] != second));

    let (status, _) = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "email": "second.admin@hr.com", "password": "secret1" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_can_change_role_and_link_employee() {
    let app = TestApp::new().await.unwrap();
    let token = app.admin_token().await;
    let employee_id = app.create_employee("Jane", "jane@hr.com").await;
    let user_id = app
        .create_user("jane.user@hr.com", "secret1", Role::Employee, None)
        .await;

    let (status, body) = app
        .put(
            &format!("/api/v1/admin/users/{user_id}"),
            &token,
            json!({ "role": "manager", "employeeId": employee_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "manager");
    assert_eq!(body["employeeId"], employee_id);
    assert_eq!(body["isActive"], true);

    let (status, body) = app
        .put(
            &format!("/api/v1/admin/users/{user_id}"),
            &token,
            json!({ "employeeId": 9_999 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Employee not found");
}
