//! Full lifecycle test against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every entity
//! operation over real HTTP, with ureq as the host executor. Validates that
//! request building, the batch envelopes and reply parsing agree with the
//! server end to end.

use amocrm_core::{
    ApiError, ApiResult, Batch, Config, Crm, HttpMethod, HttpRequest, HttpResponse,
};
use mock_server::{DEFAULT_API_KEY, DEFAULT_LOGIN};

/// Execute an `HttpRequest` using ureq and return an `HttpResponse`.
///
/// Disables ureq's automatic status-code-as-error behavior so 4xx/5xx
/// responses are returned as data, letting the core interpret them.
fn execute(req: HttpRequest) -> ApiResult<HttpResponse> {
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();

    let result = match req.method {
        HttpMethod::Get => {
            let mut builder = agent.get(&req.url);
            for (k, v) in &req.query {
                builder = builder.query(k, v);
            }
            for (k, v) in &req.headers {
                builder = builder.header(k.as_str(), v.as_str());
            }
            builder.call()
        }
        HttpMethod::Post => {
            let mut builder = agent.post(&req.url);
            for (k, v) in &req.query {
                builder = builder.query(k, v);
            }
            let body = req.body.unwrap_or_default();
            builder.content_type("application/json").send(body.as_bytes())
        }
    };
    let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

    let status = response.status().as_u16();
    let body = response.body_mut().read_to_string().unwrap_or_default();
    Ok(HttpResponse::new(status, body))
}

fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

#[test]
fn entity_lifecycle() {
    let base_url = start_server();
    let crm = Crm::connect(Config::new(&base_url, DEFAULT_LOGIN, DEFAULT_API_KEY), execute);

    // Step 1: list: the server answers 204, which reads as empty.
    let tasks = crm.tasks().list(&[], None).unwrap();
    assert!(tasks.is_empty(), "expected empty list");

    // Step 2: add one task: scalar id.
    let mut task = crm.task();
    task.set_text("Call the client")
        .set_complete_till("tomorrow")
        .set_responsible_user_id(5);
    let task_id = match crm.tasks().add(vec![task]).unwrap() {
        Batch::One(Some(id)) => id,
        other => panic!("expected a single id, got {other:?}"),
    };
    assert!(task_id > 0);

    // Step 3: add two customers: ids in submission order.
    let customers = ["Alpha", "Beta"]
        .into_iter()
        .map(|name| {
            let mut c = crm.customer();
            c.set_name(name).set_tags(["new", name]).set_next_date("+30 days");
            c
        })
        .collect();
    let ids = match crm.customers().add(customers).unwrap() {
        Batch::Many(ids) => ids.into_iter().collect::<Option<Vec<i64>>>().expect("every customer has an id"),
        other => panic!("expected several ids, got {other:?}"),
    };
    assert_eq!(ids.len(), 2);
    assert!(ids[0] < ids[1]);

    // Step 4: update the task.
    let updated = crm
        .tasks()
        .update(crm.task(), task_id, "Client called back", true, None)
        .unwrap();
    assert!(updated);

    // Step 5: list: the update is visible.
    let tasks = crm.tasks().list(&[], None).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["text"], "Client called back");
    assert_eq!(tasks[0]["status"], 1);

    // Step 6: modified-since filter in the future matches nothing.
    let tasks = crm.tasks().list(&[], Some("+1 day")).unwrap();
    assert!(tasks.is_empty());

    // Step 7: customers are listed with joined tags.
    let listed = crm.customers().list(&[("limit_rows", "1")], None).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["tags"], "new,Alpha");

    // Step 8: update of an unknown customer surfaces the server error.
    let err = crm.customers().update(crm.customer(), 9_999, None).unwrap_err();
    assert!(matches!(err, ApiError::Api { ref code, .. } if code == "244"), "{err:?}");

    // Step 9: update without an id never reaches the server.
    let err = crm.customers().update(crm.customer(), 0, None).unwrap_err();
    assert!(matches!(err, ApiError::InvalidArgument(_)));

    // Step 10: link, list, unlink.
    let mut link = crm.link();
    link.set_from("leads", 100).set_to("catalog_elements", 200).set_quantity(3);
    let record = crm.links().add_one(link).unwrap().expect("link record");
    assert_eq!(record["to_id"], 200);

    let links = crm.links().list(&[], None).unwrap();
    assert_eq!(links.len(), 1);

    let mut link = crm.link();
    link.set_from("leads", 100).set_to("catalog_elements", 200);
    assert!(crm.links().unlink(vec![link]).unwrap());
    assert!(crm.links().list(&[], None).unwrap().is_empty());
}

#[test]
fn wrong_credentials_are_unauthorized() {
    let base_url = start_server();
    let crm = Crm::connect(Config::new(&base_url, DEFAULT_LOGIN, "wrong"), execute);

    let err = crm.tasks().list(&[], None).unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
}
