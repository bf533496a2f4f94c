// Tests for the dependency injection container

use knit_core::{
    Container, Dependencies, DependencyDeclaration, Error, Injectable, Lifecycle, Result, Token,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, mpsc};
use std::thread;
use std::time::Duration;

#[derive(Debug)]
struct ServiceA;

impl Injectable for ServiceA {
    fn construct(_: &mut Dependencies) -> Result<Self> {
        Ok(ServiceA)
    }
}

#[derive(Debug)]
struct ServiceB {
    a: Arc<ServiceA>,
}

impl Injectable for ServiceB {
    fn dependencies() -> DependencyDeclaration {
        DependencyDeclaration::new().param::<ServiceA>()
    }

    fn construct(deps: &mut Dependencies) -> Result<Self> {
        Ok(ServiceB { a: deps.next()? })
    }
}

struct ServiceC {
    a: Arc<ServiceA>,
    label: Arc<String>,
}

impl Injectable for ServiceC {
    fn dependencies() -> DependencyDeclaration {
        DependencyDeclaration::new()
            .param::<ServiceA>()
            .param::<String>()
            .inject(1, "token:b")
    }

    fn construct(deps: &mut Dependencies) -> Result<Self> {
        Ok(ServiceC {
            a: deps.next()?,
            label: deps.next()?,
        })
    }
}

struct CycleX;
struct CycleY;

impl Injectable for CycleX {
    fn dependencies() -> DependencyDeclaration {
        DependencyDeclaration::new().param::<CycleY>()
    }

    fn construct(deps: &mut Dependencies) -> Result<Self> {
        deps.next::<CycleY>()?;
        Ok(CycleX)
    }
}

impl Injectable for CycleY {
    fn dependencies() -> DependencyDeclaration {
        DependencyDeclaration::new().param::<CycleX>()
    }

    fn construct(deps: &mut Dependencies) -> Result<Self> {
        deps.next::<CycleX>()?;
        Ok(CycleY)
    }
}

#[test]
fn test_singleton_returns_same_instance() {
    let container = Container::new();
    container.register::<ServiceA>(Lifecycle::Singleton).unwrap();

    let first = container.resolve::<ServiceA>().unwrap();
    let second = container.resolve::<ServiceA>().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_prototype_returns_fresh_instances() {
    let container = Container::new();
    container.register::<ServiceB>(Lifecycle::Prototype).unwrap();
    container.register::<ServiceA>(Lifecycle::Prototype).unwrap();

    let first = container.resolve::<ServiceB>().unwrap();
    let second = container.resolve::<ServiceB>().unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert!(!Arc::ptr_eq(&first.a, &second.a));
}

#[test]
fn test_duplicate_registration_fails() {
    let container = Container::new();
    container.register::<ServiceA>(Lifecycle::Singleton).unwrap();

    let err = container
        .register::<ServiceA>(Lifecycle::Prototype)
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateToken { .. }));

    container.provide_value("token:b", String::from("b")).unwrap();
    let err = container
        .provide("token:b", |_| Ok(String::from("again")))
        .unwrap_err();
    assert_eq!(err.token(), Some(&Token::named("token:b")));
}

#[test]
fn test_resolve_unknown_token_fails() {
    let container = Container::new();
    container.register::<ServiceA>(Lifecycle::Singleton).unwrap();

    match container.resolve::<ServiceB>() {
        Err(Error::UnresolvedToken { token, registered }) => {
            assert_eq!(token, Token::of::<ServiceB>());
            assert_eq!(registered, vec![Token::of::<ServiceA>()]);
        }
        other => panic!("expected unresolved token, got ok={}", other.is_ok()),
    }
}

#[test]
fn test_missing_nested_dependency_fails_whole_graph() {
    let container = Container::new();
    container.register::<ServiceB>(Lifecycle::Singleton).unwrap();

    let err = container.resolve::<ServiceB>().unwrap_err();
    assert!(matches!(err, Error::UnresolvedToken { ref token, .. } if *token == Token::of::<ServiceA>()));
}

#[test]
fn test_dependency_shares_singleton() {
    let container = Container::new();
    container
        .register::<ServiceA>(Lifecycle::Singleton)
        .unwrap()
        .register::<ServiceB>(Lifecycle::Prototype)
        .unwrap();

    let b = container.resolve::<ServiceB>().unwrap();
    let a = container.resolve::<ServiceA>().unwrap();
    assert!(Arc::ptr_eq(&b.a, &a));
}

#[test]
fn test_named_override_takes_precedence() {
    let container = Container::new();
    container.register::<ServiceA>(Lifecycle::Singleton).unwrap();
    container.register::<ServiceC>(Lifecycle::Singleton).unwrap();
    container
        .provide_value(Token::of::<String>(), String::from("by type"))
        .unwrap();
    container
        .provide_value("token:b", String::from("by name"))
        .unwrap();

    let c = container.resolve::<ServiceC>().unwrap();
    assert_eq!(c.label.as_str(), "by name");
    assert!(Arc::ptr_eq(&c.a, &container.resolve::<ServiceA>().unwrap()));
}

#[test]
fn test_out_of_band_declaration_wins_over_default() {
    let container = Container::new();
    container
        .declare::<ServiceC>(
            DependencyDeclaration::new()
                .param::<ServiceA>()
                .param::<String>()
                .inject(1, "token:other"),
        )
        .unwrap();
    container.register::<ServiceA>(Lifecycle::Singleton).unwrap();
    container.register::<ServiceC>(Lifecycle::Singleton).unwrap();
    container
        .provide_value("token:other", String::from("other"))
        .unwrap();

    assert_eq!(
        container.resolve_params(&Token::of::<ServiceC>()).unwrap(),
        vec![Token::of::<ServiceA>(), Token::named("token:other")]
    );
    assert_eq!(container.resolve::<ServiceC>().unwrap().label.as_str(), "other");
}

#[test]
fn test_concurrent_first_resolution_runs_factory_once() {
    const CALLERS: usize = 16;

    let container = Container::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    container
        .provide("slow", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            Ok(String::from("shared"))
        })
        .unwrap();

    let barrier = Arc::new(Barrier::new(CALLERS));
    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let container = container.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                container.resolve_named::<String>("slow").unwrap()
            })
        })
        .collect();

    let instances: Vec<Arc<String>> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(instances.len(), CALLERS);
    assert!(instances.iter().all(|i| Arc::ptr_eq(i, &instances[0])));
}

#[test]
fn test_cycle_fails_with_path() {
    let container = Container::new();
    container.register::<CycleX>(Lifecycle::Singleton).unwrap();
    container.register::<CycleY>(Lifecycle::Singleton).unwrap();

    match container.resolve::<CycleX>() {
        Err(Error::CyclicDependency { path }) => {
            assert_eq!(
                path,
                vec![Token::of::<CycleX>(), Token::of::<CycleY>(), Token::of::<CycleX>()]
            );
        }
        other => panic!("expected cycle, got ok={}", other.is_ok()),
    }

    // Neither singleton was published
    assert!(matches!(
        container.resolve::<CycleY>(),
        Err(Error::CyclicDependency { .. })
    ));
}

#[test]
fn test_failed_singleton_can_be_retried() {
    let container = Container::new();
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    container
        .provide("flaky", move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(Error::factory("connection refused"))
            } else {
                Ok(7u16)
            }
        })
        .unwrap();

    let err = container.resolve_named::<u16>("flaky").unwrap_err();
    assert_eq!(err.to_string(), "Provider factory failed: connection refused");

    let first = container.resolve_named::<u16>("flaky").unwrap();
    let second = container.resolve_named::<u16>("flaky").unwrap();
    assert_eq!(*first, 7);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_containers_are_isolated() {
    let first = Container::new();
    let second = Container::new();
    first.register::<ServiceA>(Lifecycle::Singleton).unwrap();

    assert!(first.has::<ServiceA>());
    assert!(!second.has::<ServiceA>());
    second.register::<ServiceA>(Lifecycle::Singleton).unwrap();

    let a1 = first.resolve::<ServiceA>().unwrap();
    let a2 = second.resolve::<ServiceA>().unwrap();
    assert!(!Arc::ptr_eq(&a1, &a2));
}

#[test]
fn test_clones_share_registry_and_cache() {
    let container = Container::new();
    let handle = container.clone();
    handle.register::<ServiceA>(Lifecycle::Singleton).unwrap();

    let a1 = container.resolve::<ServiceA>().unwrap();
    let a2 = handle.resolve::<ServiceA>().unwrap();
    assert!(Arc::ptr_eq(&a1, &a2));
}

#[test]
fn test_factory_can_resolve_nested_tokens() {
    let container = Container::new();
    container.provide_value("host", String::from("localhost")).unwrap();
    container.provide_value("port", 8080u16).unwrap();
    container
        .provide_with("address", Lifecycle::Prototype, |resolver| {
            let host = resolver.resolve_named::<String>("host")?;
            let port = resolver.resolve_named::<u16>("port")?;
            Ok(format!("{}:{}", host, port))
        })
        .unwrap();

    let first = container.resolve_named::<String>("address").unwrap();
    let second = container.resolve_named::<String>("address").unwrap();
    assert_eq!(first.as_str(), "localhost:8080");
    assert!(!Arc::ptr_eq(&first, &second));
}

struct GatedX;
struct GatedY;

impl Injectable for GatedX {
    fn dependencies() -> DependencyDeclaration {
        DependencyDeclaration::new()
            .param_token("gate.x")
            .param::<GatedY>()
    }

    fn construct(deps: &mut Dependencies) -> Result<Self> {
        deps.next::<()>()?;
        deps.next::<GatedY>()?;
        Ok(GatedX)
    }
}

impl Injectable for GatedY {
    fn dependencies() -> DependencyDeclaration {
        DependencyDeclaration::new()
            .param_token("gate.y")
            .param::<GatedX>()
    }

    fn construct(deps: &mut Dependencies) -> Result<Self> {
        deps.next::<()>()?;
        deps.next::<GatedX>()?;
        Ok(GatedY)
    }
}

#[test]
fn test_concurrent_cycle_fails_instead_of_blocking() {
    let container = Container::new();
    for gate in ["gate.x", "gate.y"] {
        container
            .provide_with(gate, Lifecycle::Prototype, |_| {
                thread::sleep(Duration::from_millis(50));
                Ok(())
            })
            .unwrap();
    }
    container.register::<GatedX>(Lifecycle::Singleton).unwrap();
    container.register::<GatedY>(Lifecycle::Singleton).unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let (sender, receiver) = mpsc::channel();
    for side in 0..2 {
        let container = container.clone();
        let barrier = barrier.clone();
        let sender = sender.clone();
        thread::spawn(move || {
            barrier.wait();
            let result = if side == 0 {
                container.resolve::<GatedX>().map(|_| ())
            } else {
                container.resolve::<GatedY>().map(|_| ())
            };
            let _ = sender.send(result);
        });
    }

    for _ in 0..2 {
        let result = receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("resolution blocked on a cyclic singleton");
        assert!(matches!(result, Err(Error::CyclicDependency { .. })));
    }

    // Both slots were released, so a later resolve fails the same way
    assert!(matches!(
        container.resolve::<GatedX>(),
        Err(Error::CyclicDependency { .. })
    ));
}

#[test]
fn test_factory_reentering_through_container_handle_is_a_cycle() {
    let container = Container::new();
    let handle = container.clone();
    container
        .provide("selfref", move |_| {
            handle.resolve_named::<u8>("selfref").map(|value| *value)
        })
        .unwrap();
    let handle = container.clone();
    container
        .provide_with("loop", Lifecycle::Prototype, move |_| {
            handle.resolve_named::<u8>("loop").map(|value| *value)
        })
        .unwrap();

    let (sender, receiver) = mpsc::channel();
    let worker = container.clone();
    thread::spawn(move || {
        let _ = sender.send((
            worker.resolve_named::<u8>("selfref"),
            worker.resolve_named::<u8>("loop"),
        ));
    });

    let (singleton, prototype) = receiver
        .recv_timeout(Duration::from_secs(5))
        .expect("re-entrant resolution blocked");
    match singleton {
        Err(Error::CyclicDependency { path }) => {
            assert_eq!(path, vec![Token::named("selfref"), Token::named("selfref")]);
        }
        other => panic!("expected cycle, got ok={}", other.is_ok()),
    }
    assert!(matches!(prototype, Err(Error::CyclicDependency { .. })));
}
